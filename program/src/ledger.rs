//! # Ledger Arena
//!
//! The host-side arena vault instructions execute against: encoded records
//! keyed by derived address, native balances per address, secondary-asset
//! balances per (mint, holder), and an injected clock.
//!
//! Records are stored *encoded*. Every instruction decodes the target
//! record, runs every check, and only then writes — so a failed
//! instruction is invisible, and scanners read the same bytes the program
//! wrote. An address whose bytes no longer decode is treated as having no
//! record at all (`AccountNotFound`); monitoring still sees and skips it.
//!
//! Concurrency is the host's problem by design: callers serialize access
//! (the watchtower wraps this in an `RwLock`), and each `execute` is a
//! single check-then-commit unit under that serialization.

use crate::error::VaultError;
use crate::instructions::{InitializeParams, Instruction, UpdateVaultParams};
use crate::layout::{self, MemcmpFilter};
use crate::state::VaultRecord;
use std::collections::HashMap;
use vigil_protocol::config::{MAX_CONTENT_REF_BYTES, MAX_NAME_BYTES, RECORD_RENT_LAMPORTS};
use vigil_protocol::{derive_vault_address, Address, Clock};

/// The devnet ledger arena.
pub struct Ledger {
    /// Encoded vault records by derived address.
    records: HashMap<Address, Vec<u8>>,
    /// Native lamport balances, wallets and vault accounts alike.
    balances: HashMap<Address, u64>,
    /// Secondary-asset balances keyed by (mint, holder).
    token_balances: HashMap<(Address, Address), u64>,
    clock: Clock,
}

impl Ledger {
    /// An empty arena reading time from `clock`.
    pub fn new(clock: Clock) -> Self {
        Self {
            records: HashMap::new(),
            balances: HashMap::new(),
            token_balances: HashMap::new(),
            clock,
        }
    }

    /// Rebuild an arena from persisted state.
    pub fn restore(
        clock: Clock,
        records: impl IntoIterator<Item = (Address, Vec<u8>)>,
        balances: impl IntoIterator<Item = (Address, u64)>,
        token_balances: impl IntoIterator<Item = ((Address, Address), u64)>,
    ) -> Self {
        Self {
            records: records.into_iter().collect(),
            balances: balances.into_iter().collect(),
            token_balances: token_balances.into_iter().collect(),
            clock,
        }
    }

    /// The arena's clock.
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Native balance of `address` (unknown addresses hold zero).
    pub fn balance(&self, address: &Address) -> u64 {
        self.balances.get(address).copied().unwrap_or(0)
    }

    /// Secondary-asset balance of `holder` for `mint`.
    pub fn token_balance(&self, mint: &Address, holder: &Address) -> u64 {
        self.token_balances
            .get(&(*mint, *holder))
            .copied()
            .unwrap_or(0)
    }

    /// Number of record accounts (decodable or not).
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Devnet faucet.
    pub fn airdrop(&mut self, address: &Address, lamports: u64) -> Result<(), VaultError> {
        let next = self
            .balance(address)
            .checked_add(lamports)
            .ok_or(VaultError::CalculationOverflow)?;
        self.balances.insert(*address, next);
        Ok(())
    }

    /// Devnet token faucet: mints `amount` of `mint` to `holder`.
    pub fn airdrop_tokens(
        &mut self,
        mint: &Address,
        holder: &Address,
        amount: u64,
    ) -> Result<(), VaultError> {
        let next = self
            .token_balance(mint, holder)
            .checked_add(amount)
            .ok_or(VaultError::CalculationOverflow)?;
        self.token_balances.insert((*mint, *holder), next);
        Ok(())
    }

    /// Plant raw bytes at an address. Exists so tests and devnet tooling
    /// can reproduce the partially-written records scanners must survive.
    pub fn write_raw_account(&mut self, address: Address, bytes: Vec<u8>) {
        self.records.insert(address, bytes);
    }

    /// Raw bytes at an account, exactly as last written.
    pub fn account_bytes(&self, address: &Address) -> Option<Vec<u8>> {
        self.records.get(address).cloned()
    }

    /// Decode the record at `vault`.
    ///
    /// Missing and undecodable both come back as `AccountNotFound`: bytes
    /// the program cannot read are bytes the program will not execute
    /// against.
    pub fn record(&self, vault: &Address) -> Result<VaultRecord, VaultError> {
        let bytes = self
            .records
            .get(vault)
            .ok_or(VaultError::AccountNotFound)?;
        layout::decode(bytes).map_err(|_| VaultError::AccountNotFound)
    }

    /// Raw account snapshots matching every filter, sorted by address so
    /// scans are reproducible.
    pub fn scan(&self, filters: &[MemcmpFilter]) -> Vec<(Address, Vec<u8>)> {
        let mut matches: Vec<(Address, Vec<u8>)> = self
            .records
            .iter()
            .filter(|(_, bytes)| filters.iter().all(|f| f.matches(bytes)))
            .map(|(addr, bytes)| (*addr, bytes.clone()))
            .collect();
        matches.sort_by_key(|(addr, _)| *addr);
        matches
    }

    // -- persistence iteration ----------------------------------------------

    pub fn iter_records(&self) -> impl Iterator<Item = (&Address, &Vec<u8>)> {
        self.records.iter()
    }

    pub fn iter_balances(&self) -> impl Iterator<Item = (&Address, &u64)> {
        self.balances.iter()
    }

    pub fn iter_token_balances(&self) -> impl Iterator<Item = (&(Address, Address), &u64)> {
        self.token_balances.iter()
    }

    // -- execution ----------------------------------------------------------

    /// Execute one instruction as `signer`, returning the affected record
    /// address.
    ///
    /// The host has already authenticated `signer` (in-process, possession
    /// of the keypair at the chain boundary). Atomic: on `Err`, nothing
    /// changed.
    pub fn execute(
        &mut self,
        signer: &Address,
        instruction: Instruction,
    ) -> Result<Address, VaultError> {
        match instruction {
            Instruction::Initialize(params) => self.initialize(signer, params),
            Instruction::Ping { vault } => self.ping(signer, vault),
            Instruction::SetDelegate { vault, delegate } => {
                self.set_delegate(signer, vault, delegate)
            }
            Instruction::UpdateVault { vault, params } => self.update_vault(signer, vault, params),
            Instruction::TopUpBounty { vault, amount } => self.top_up_bounty(signer, vault, amount),
            Instruction::LockTokens {
                vault,
                mint,
                amount,
            } => self.lock_tokens(signer, vault, mint, amount),
            Instruction::TriggerRelease { vault } => self.trigger_release(signer, vault),
            Instruction::ClaimSol { vault } => self.claim_sol(signer, vault),
            Instruction::ClaimTokens { vault } => self.claim_tokens(signer, vault),
            Instruction::CloseVault { vault } => self.close_vault(signer, vault),
        }
    }

    fn put_record(&mut self, vault: Address, record: &VaultRecord) {
        self.records.insert(vault, layout::encode(record));
    }

    fn initialize(
        &mut self,
        signer: &Address,
        params: InitializeParams,
    ) -> Result<Address, VaultError> {
        if params.name.len() > MAX_NAME_BYTES {
            return Err(VaultError::NameTooLong);
        }
        if params.content_ref.len() > MAX_CONTENT_REF_BYTES
            || params.content_key_ref.len() > MAX_CONTENT_REF_BYTES
        {
            return Err(VaultError::ContentRefTooLong);
        }
        if params.time_interval <= 0 {
            return Err(VaultError::InvalidTimeInterval);
        }

        let (vault, bump) = derive_vault_address(signer, params.seed);
        if self.records.contains_key(&vault) {
            return Err(VaultError::AccountInUse);
        }

        // The signer funds rent + bounty + locked value in one deposit.
        let deposit = RECORD_RENT_LAMPORTS
            .checked_add(params.bounty_lamports)
            .and_then(|v| v.checked_add(params.locked_value))
            .ok_or(VaultError::CalculationOverflow)?;
        let signer_after = self
            .balance(signer)
            .checked_sub(deposit)
            .ok_or(VaultError::InsufficientFunds)?;
        let vault_after = self
            .balance(&vault)
            .checked_add(deposit)
            .ok_or(VaultError::CalculationOverflow)?;

        let record = VaultRecord {
            owner: *signer,
            recipient: params.recipient,
            content_ref: params.content_ref,
            content_key_ref: params.content_key_ref,
            time_interval: params.time_interval,
            last_check_in: self.clock.now(),
            is_released: false,
            name: params.name,
            delegate: None,
            bounty_lamports: params.bounty_lamports,
            seed: params.seed,
            bump,
            locked_value: params.locked_value,
            token_mint: None,
            locked_tokens: 0,
        };

        self.balances.insert(*signer, signer_after);
        self.balances.insert(vault, vault_after);
        self.put_record(vault, &record);
        Ok(vault)
    }

    fn ping(&mut self, signer: &Address, vault: Address) -> Result<Address, VaultError> {
        let mut record = self.record(&vault)?;
        if !record.may_ping(signer) {
            return Err(VaultError::Unauthorized);
        }
        if record.is_released {
            return Err(VaultError::AlreadyReleased);
        }

        record.last_check_in = self.clock.now();
        self.put_record(vault, &record);
        Ok(vault)
    }

    fn set_delegate(
        &mut self,
        signer: &Address,
        vault: Address,
        delegate: Option<Address>,
    ) -> Result<Address, VaultError> {
        let mut record = self.record(&vault)?;
        if *signer != record.owner {
            return Err(VaultError::Unauthorized);
        }

        record.delegate = delegate;
        self.put_record(vault, &record);
        Ok(vault)
    }

    fn update_vault(
        &mut self,
        signer: &Address,
        vault: Address,
        params: UpdateVaultParams,
    ) -> Result<Address, VaultError> {
        let mut record = self.record(&vault)?;
        if *signer != record.owner {
            return Err(VaultError::Unauthorized);
        }
        if record.is_released {
            return Err(VaultError::AlreadyReleased);
        }
        if let Some(name) = &params.new_name {
            if name.len() > MAX_NAME_BYTES {
                return Err(VaultError::NameTooLong);
            }
        }
        if let Some(interval) = params.new_time_interval {
            if interval <= 0 {
                return Err(VaultError::InvalidTimeInterval);
            }
        }

        if let Some(recipient) = params.new_recipient {
            record.recipient = recipient;
        }
        if let Some(interval) = params.new_time_interval {
            record.time_interval = interval;
        }
        if let Some(name) = params.new_name {
            record.name = name;
        }
        self.put_record(vault, &record);
        Ok(vault)
    }

    fn top_up_bounty(
        &mut self,
        signer: &Address,
        vault: Address,
        amount: u64,
    ) -> Result<Address, VaultError> {
        let mut record = self.record(&vault)?;
        if *signer != record.owner {
            return Err(VaultError::Unauthorized);
        }
        if amount == 0 {
            return Err(VaultError::InvalidAmount);
        }

        let bounty_after = record
            .bounty_lamports
            .checked_add(amount)
            .ok_or(VaultError::CalculationOverflow)?;
        let signer_after = self
            .balance(signer)
            .checked_sub(amount)
            .ok_or(VaultError::InsufficientFunds)?;
        let vault_after = self
            .balance(&vault)
            .checked_add(amount)
            .ok_or(VaultError::CalculationOverflow)?;

        record.bounty_lamports = bounty_after;
        self.balances.insert(*signer, signer_after);
        self.balances.insert(vault, vault_after);
        self.put_record(vault, &record);
        Ok(vault)
    }

    fn lock_tokens(
        &mut self,
        signer: &Address,
        vault: Address,
        mint: Address,
        amount: u64,
    ) -> Result<Address, VaultError> {
        let mut record = self.record(&vault)?;
        if *signer != record.owner {
            return Err(VaultError::Unauthorized);
        }
        if record.is_released {
            return Err(VaultError::AlreadyReleased);
        }
        if amount == 0 {
            return Err(VaultError::InvalidAmount);
        }
        // The first lock fixes the mint; every later lock must match it.
        if let Some(existing) = record.token_mint {
            if existing != mint {
                return Err(VaultError::InvalidTokenMint);
            }
        }

        let locked_after = record
            .locked_tokens
            .checked_add(amount)
            .ok_or(VaultError::CalculationOverflow)?;
        let signer_after = self
            .token_balance(&mint, signer)
            .checked_sub(amount)
            .ok_or(VaultError::InsufficientFunds)?;
        let vault_after = self
            .token_balance(&mint, &vault)
            .checked_add(amount)
            .ok_or(VaultError::CalculationOverflow)?;

        record.token_mint = Some(mint);
        record.locked_tokens = locked_after;
        self.token_balances.insert((mint, *signer), signer_after);
        self.token_balances.insert((mint, vault), vault_after);
        self.put_record(vault, &record);
        Ok(vault)
    }

    fn trigger_release(&mut self, signer: &Address, vault: Address) -> Result<Address, VaultError> {
        let mut record = self.record(&vault)?;
        // Released first: a repeat trigger reports AlreadyReleased no
        // matter what the clock says.
        if record.is_released {
            return Err(VaultError::AlreadyReleased);
        }
        if !record.is_expired(self.clock.now())? {
            return Err(VaultError::NotExpired);
        }

        // Flip and payout are one atomic unit: nobody ever observes a
        // released vault still holding its bounty.
        let bounty = record.bounty_lamports;
        let vault_after = self
            .balance(&vault)
            .checked_sub(bounty)
            .ok_or(VaultError::CalculationOverflow)?;
        let hunter_after = self
            .balance(signer)
            .checked_add(bounty)
            .ok_or(VaultError::CalculationOverflow)?;

        record.is_released = true;
        record.bounty_lamports = 0;
        self.balances.insert(vault, vault_after);
        self.balances.insert(*signer, hunter_after);
        self.put_record(vault, &record);
        Ok(vault)
    }

    fn claim_sol(&mut self, signer: &Address, vault: Address) -> Result<Address, VaultError> {
        let mut record = self.record(&vault)?;
        if *signer != record.recipient {
            return Err(VaultError::Unauthorized);
        }
        if !record.is_released {
            return Err(VaultError::NotReleased);
        }
        if record.locked_value == 0 {
            return Err(VaultError::NoLockedSol);
        }

        // Single-shot: the full locked balance moves and the field zeroes.
        let amount = record.locked_value;
        let vault_after = self
            .balance(&vault)
            .checked_sub(amount)
            .ok_or(VaultError::CalculationOverflow)?;
        let recipient_after = self
            .balance(signer)
            .checked_add(amount)
            .ok_or(VaultError::CalculationOverflow)?;

        record.locked_value = 0;
        self.balances.insert(vault, vault_after);
        self.balances.insert(*signer, recipient_after);
        self.put_record(vault, &record);
        Ok(vault)
    }

    fn claim_tokens(&mut self, signer: &Address, vault: Address) -> Result<Address, VaultError> {
        let mut record = self.record(&vault)?;
        if *signer != record.recipient {
            return Err(VaultError::Unauthorized);
        }
        if !record.is_released {
            return Err(VaultError::NotReleased);
        }
        let Some(mint) = record.token_mint else {
            return Err(VaultError::NoLockedTokens);
        };
        if record.locked_tokens == 0 {
            return Err(VaultError::NoLockedTokens);
        }

        let amount = record.locked_tokens;
        let vault_after = self
            .token_balance(&mint, &vault)
            .checked_sub(amount)
            .ok_or(VaultError::CalculationOverflow)?;
        let recipient_after = self
            .token_balance(&mint, signer)
            .checked_add(amount)
            .ok_or(VaultError::CalculationOverflow)?;

        record.locked_tokens = 0;
        self.token_balances.insert((mint, vault), vault_after);
        self.token_balances.insert((mint, *signer), recipient_after);
        self.put_record(vault, &record);
        Ok(vault)
    }

    fn close_vault(&mut self, signer: &Address, vault: Address) -> Result<Address, VaultError> {
        let record = self.record(&vault)?;
        if *signer != record.owner {
            return Err(VaultError::Unauthorized);
        }
        // Post-release the record is the recipient's claim ticket; the
        // owner doesn't get to destroy it.
        if record.is_released {
            return Err(VaultError::AlreadyReleased);
        }

        // Everything the vault account holds (rent + bounty + locked
        // value) flows back to the owner, along with any locked tokens.
        let refund = self.balance(&vault);
        let owner_after = self
            .balance(signer)
            .checked_add(refund)
            .ok_or(VaultError::CalculationOverflow)?;

        let token_refund = match record.token_mint {
            Some(mint) if record.locked_tokens > 0 => {
                let vault_tokens_after = self
                    .token_balance(&mint, &vault)
                    .checked_sub(record.locked_tokens)
                    .ok_or(VaultError::CalculationOverflow)?;
                let owner_tokens_after = self
                    .token_balance(&mint, signer)
                    .checked_add(record.locked_tokens)
                    .ok_or(VaultError::CalculationOverflow)?;
                Some((mint, vault_tokens_after, owner_tokens_after))
            }
            _ => None,
        };

        self.balances.insert(*signer, owner_after);
        self.balances.remove(&vault);
        if let Some((mint, vault_tokens_after, owner_tokens_after)) = token_refund {
            self.token_balances.insert((mint, vault), vault_tokens_after);
            self.token_balances.insert((mint, *signer), owner_tokens_after);
        }
        self.records.remove(&vault);
        Ok(vault)
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(Clock::system())
    }
}
