//! End-to-end lifecycle tests for the vault program: create, ping,
//! expire, release, claim, close. Runs against the in-process ledger
//! arena with a manual clock so deadlines are exact.

use vigil_program::{
    InitializeParams, Instruction, Ledger, UpdateVaultParams, VaultError,
};
use vigil_protocol::config::RECORD_RENT_LAMPORTS;
use vigil_protocol::{Address, Clock, Keypair};

const GENESIS: i64 = 1_756_080_000;
const DAY: i64 = 86_400;
const WALLET: u64 = 50_000_000_000;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Harness {
    ledger: Ledger,
    owner: Keypair,
    recipient: Keypair,
    hunter: Keypair,
}

impl Harness {
    fn new() -> Self {
        let mut ledger = Ledger::new(Clock::manual(GENESIS));
        let owner = Keypair::generate();
        let recipient = Keypair::generate();
        let hunter = Keypair::generate();
        for kp in [&owner, &recipient, &hunter] {
            ledger.airdrop(&kp.address(), WALLET).unwrap();
        }
        Self {
            ledger,
            owner,
            recipient,
            hunter,
        }
    }

    fn create_vault(&mut self, seed: u64, interval: i64, bounty: u64, locked: u64) -> Address {
        self.ledger
            .execute(
                &self.owner.address(),
                Instruction::Initialize(InitializeParams {
                    seed,
                    content_ref: "ipfs://bafybeigdyrzt5example".into(),
                    content_key_ref: "arweave://keyshard-3".into(),
                    recipient: self.recipient.address(),
                    time_interval: interval,
                    bounty_lamports: bounty,
                    name: "estate plan".into(),
                    locked_value: locked,
                }),
            )
            .unwrap()
    }

    fn total_lamports(&self) -> u64 {
        self.ledger.iter_balances().map(|(_, v)| *v).sum()
    }
}

// ---------------------------------------------------------------------------
// Happy path
// ---------------------------------------------------------------------------

#[test]
fn full_lifecycle_create_ping_release_claim() {
    let mut h = Harness::new();
    let mint = Keypair::generate().address();
    h.ledger
        .airdrop_tokens(&mint, &h.owner.address(), 2_000)
        .unwrap();

    // 1. Owner creates a 30-day vault with a bounty and locked value.
    let vault = h.create_vault(7, 30 * DAY, 100_000, 3_000_000_000);
    h.ledger
        .execute(
            &h.owner.address(),
            Instruction::LockTokens {
                vault,
                mint,
                amount: 2_000,
            },
        )
        .unwrap();

    // 2. Owner checks in twice over two weeks; the vault stays healthy.
    for _ in 0..2 {
        h.ledger.clock().advance(7 * DAY);
        h.ledger
            .execute(&h.owner.address(), Instruction::Ping { vault })
            .unwrap();
    }
    let record = h.ledger.record(&vault).unwrap();
    assert!(!record.is_expired(h.ledger.clock().now()).unwrap());

    // 3. The owner goes silent past the full interval.
    h.ledger.clock().advance(30 * DAY + 1);
    assert!(h
        .ledger
        .record(&vault)
        .unwrap()
        .is_expired(h.ledger.clock().now())
        .unwrap());

    // 4. A third party triggers the release and pockets the bounty.
    let hunter_before = h.ledger.balance(&h.hunter.address());
    h.ledger
        .execute(&h.hunter.address(), Instruction::TriggerRelease { vault })
        .unwrap();
    assert_eq!(h.ledger.balance(&h.hunter.address()), hunter_before + 100_000);

    let record = h.ledger.record(&vault).unwrap();
    assert!(record.is_released);
    assert_eq!(record.bounty_lamports, 0);

    // 5. The recipient collects the locked value and the tokens.
    let recipient_before = h.ledger.balance(&h.recipient.address());
    h.ledger
        .execute(&h.recipient.address(), Instruction::ClaimSol { vault })
        .unwrap();
    h.ledger
        .execute(&h.recipient.address(), Instruction::ClaimTokens { vault })
        .unwrap();
    assert_eq!(
        h.ledger.balance(&h.recipient.address()),
        recipient_before + 3_000_000_000
    );
    assert_eq!(h.ledger.token_balance(&mint, &h.recipient.address()), 2_000);

    // 6. What remains on the vault account is exactly the rent.
    assert_eq!(h.ledger.balance(&vault), RECORD_RENT_LAMPORTS);
    let record = h.ledger.record(&vault).unwrap();
    assert_eq!(record.locked_value, 0);
    assert_eq!(record.locked_tokens, 0);
}

// ---------------------------------------------------------------------------
// Deadline behaviour
// ---------------------------------------------------------------------------

#[test]
fn every_ping_pushes_the_deadline_forward() {
    let mut h = Harness::new();
    let vault = h.create_vault(1, 10 * DAY, 0, 0);

    for day in 1..=25 {
        h.ledger.clock().advance(DAY);
        h.ledger
            .execute(&h.owner.address(), Instruction::Ping { vault })
            .unwrap();
        let record = h.ledger.record(&vault).unwrap();
        assert_eq!(record.last_check_in, GENESIS + day * DAY);
        assert_eq!(record.deadline().unwrap(), GENESIS + (day + 10) * DAY);
    }

    // 25 days elapsed but the last ping was just now, so no release.
    assert_eq!(
        h.ledger
            .execute(&h.hunter.address(), Instruction::TriggerRelease { vault }),
        Err(VaultError::NotExpired)
    );
}

#[test]
fn shrinking_the_interval_can_expire_a_vault() {
    let mut h = Harness::new();
    let vault = h.create_vault(1, 30 * DAY, 0, 0);

    h.ledger.clock().advance(10 * DAY);
    assert_eq!(
        h.ledger
            .execute(&h.hunter.address(), Instruction::TriggerRelease { vault }),
        Err(VaultError::NotExpired)
    );

    // Owner tightens the interval below the elapsed silence.
    h.ledger
        .execute(
            &h.owner.address(),
            Instruction::UpdateVault {
                vault,
                params: UpdateVaultParams {
                    new_time_interval: Some(7 * DAY),
                    ..Default::default()
                },
            },
        )
        .unwrap();
    assert!(h
        .ledger
        .execute(&h.hunter.address(), Instruction::TriggerRelease { vault })
        .is_ok());
}

// ---------------------------------------------------------------------------
// Release and claims
// ---------------------------------------------------------------------------

#[test]
fn bounty_goes_to_the_first_caller_only() {
    let mut h = Harness::new();
    let vault = h.create_vault(1, DAY, 250_000, 0);
    let second = Keypair::generate();
    h.ledger.airdrop(&second.address(), WALLET).unwrap();
    h.ledger.clock().advance(DAY + 1);

    h.ledger
        .execute(&h.hunter.address(), Instruction::TriggerRelease { vault })
        .unwrap();
    assert_eq!(
        h.ledger.balance(&h.hunter.address()),
        WALLET + 250_000
    );

    assert_eq!(
        h.ledger
            .execute(&second.address(), Instruction::TriggerRelease { vault }),
        Err(VaultError::AlreadyReleased)
    );
    assert_eq!(h.ledger.balance(&second.address()), WALLET);
}

#[test]
fn claims_are_single_shot() {
    let mut h = Harness::new();
    let mint = Keypair::generate().address();
    h.ledger
        .airdrop_tokens(&mint, &h.owner.address(), 900)
        .unwrap();
    let vault = h.create_vault(1, DAY, 0, 1_000_000);
    h.ledger
        .execute(
            &h.owner.address(),
            Instruction::LockTokens {
                vault,
                mint,
                amount: 900,
            },
        )
        .unwrap();
    h.ledger.clock().advance(DAY + 1);
    h.ledger
        .execute(&h.hunter.address(), Instruction::TriggerRelease { vault })
        .unwrap();

    let recipient = h.recipient.address();
    h.ledger
        .execute(&recipient, Instruction::ClaimSol { vault })
        .unwrap();
    assert_eq!(
        h.ledger.execute(&recipient, Instruction::ClaimSol { vault }),
        Err(VaultError::NoLockedSol)
    );

    h.ledger
        .execute(&recipient, Instruction::ClaimTokens { vault })
        .unwrap();
    assert_eq!(
        h.ledger.execute(&recipient, Instruction::ClaimTokens { vault }),
        Err(VaultError::NoLockedTokens)
    );

    // Balances moved exactly once.
    assert_eq!(h.ledger.balance(&recipient), WALLET + 1_000_000);
    assert_eq!(h.ledger.token_balance(&mint, &recipient), 900);
}

#[test]
fn claims_gate_on_release_and_identity() {
    let mut h = Harness::new();
    let vault = h.create_vault(1, DAY, 0, 1_000_000);

    assert_eq!(
        h.ledger
            .execute(&h.recipient.address(), Instruction::ClaimSol { vault }),
        Err(VaultError::NotReleased)
    );

    h.ledger.clock().advance(DAY + 1);
    h.ledger
        .execute(&h.hunter.address(), Instruction::TriggerRelease { vault })
        .unwrap();

    // Released, but only the recipient may claim.
    assert_eq!(
        h.ledger
            .execute(&h.hunter.address(), Instruction::ClaimSol { vault }),
        Err(VaultError::Unauthorized)
    );
    assert_eq!(
        h.ledger
            .execute(&h.owner.address(), Instruction::ClaimSol { vault }),
        Err(VaultError::Unauthorized)
    );

    // A vault that never held tokens has nothing to claim.
    h.ledger
        .execute(&h.recipient.address(), Instruction::ClaimSol { vault })
        .unwrap();
    assert_eq!(
        h.ledger
            .execute(&h.recipient.address(), Instruction::ClaimTokens { vault }),
        Err(VaultError::NoLockedTokens)
    );
}

#[test]
fn released_vault_rejects_owner_mutations() {
    let mut h = Harness::new();
    let mint = Keypair::generate().address();
    h.ledger
        .airdrop_tokens(&mint, &h.owner.address(), 100)
        .unwrap();
    let vault = h.create_vault(1, DAY, 0, 0);
    h.ledger.clock().advance(DAY + 1);
    h.ledger
        .execute(&h.hunter.address(), Instruction::TriggerRelease { vault })
        .unwrap();

    let owner = h.owner.address();
    assert_eq!(
        h.ledger.execute(&owner, Instruction::Ping { vault }),
        Err(VaultError::AlreadyReleased)
    );
    assert_eq!(
        h.ledger.execute(
            &owner,
            Instruction::UpdateVault {
                vault,
                params: UpdateVaultParams {
                    new_name: Some("too late".into()),
                    ..Default::default()
                },
            }
        ),
        Err(VaultError::AlreadyReleased)
    );
    assert_eq!(
        h.ledger.execute(
            &owner,
            Instruction::LockTokens {
                vault,
                mint,
                amount: 100,
            }
        ),
        Err(VaultError::AlreadyReleased)
    );
    assert_eq!(
        h.ledger.execute(&owner, Instruction::CloseVault { vault }),
        Err(VaultError::AlreadyReleased)
    );
}

// ---------------------------------------------------------------------------
// Delegates
// ---------------------------------------------------------------------------

#[test]
fn delegate_can_ping_until_revoked() {
    let mut h = Harness::new();
    let vault = h.create_vault(1, 5 * DAY, 0, 0);
    let delegate = Keypair::generate();
    let stranger = Keypair::generate();

    // Only the owner may appoint.
    assert_eq!(
        h.ledger.execute(
            &delegate.address(),
            Instruction::SetDelegate {
                vault,
                delegate: Some(delegate.address()),
            }
        ),
        Err(VaultError::Unauthorized)
    );
    h.ledger
        .execute(
            &h.owner.address(),
            Instruction::SetDelegate {
                vault,
                delegate: Some(delegate.address()),
            },
        )
        .unwrap();

    h.ledger.clock().advance(DAY);
    h.ledger
        .execute(&delegate.address(), Instruction::Ping { vault })
        .unwrap();
    assert_eq!(
        h.ledger.record(&vault).unwrap().last_check_in,
        GENESIS + DAY
    );
    assert_eq!(
        h.ledger
            .execute(&stranger.address(), Instruction::Ping { vault }),
        Err(VaultError::Unauthorized)
    );

    // Revocation cuts the delegate off; the owner still works.
    h.ledger
        .execute(
            &h.owner.address(),
            Instruction::SetDelegate {
                vault,
                delegate: None,
            },
        )
        .unwrap();
    assert_eq!(
        h.ledger
            .execute(&delegate.address(), Instruction::Ping { vault }),
        Err(VaultError::Unauthorized)
    );
    h.ledger
        .execute(&h.owner.address(), Instruction::Ping { vault })
        .unwrap();
}

// ---------------------------------------------------------------------------
// Closing
// ---------------------------------------------------------------------------

#[test]
fn close_refunds_and_frees_the_seed() {
    let mut h = Harness::new();
    let vault = h.create_vault(42, 10 * DAY, 70_000, 2_000_000);

    h.ledger
        .execute(&h.owner.address(), Instruction::CloseVault { vault })
        .unwrap();
    assert_eq!(h.ledger.balance(&h.owner.address()), WALLET);
    assert_eq!(h.ledger.balance(&vault), 0);
    assert_eq!(h.ledger.record(&vault), Err(VaultError::AccountNotFound));

    // The derived address is deterministic, so the same seed lands on the
    // same address and is usable again after the close.
    let again = h.create_vault(42, 10 * DAY, 0, 0);
    assert_eq!(again, vault);
}

#[test]
fn only_the_owner_closes() {
    let mut h = Harness::new();
    let vault = h.create_vault(1, DAY, 0, 0);
    for kp in [&h.recipient, &h.hunter] {
        assert_eq!(
            h.ledger
                .execute(&kp.address(), Instruction::CloseVault { vault }),
            Err(VaultError::Unauthorized)
        );
    }
}

// ---------------------------------------------------------------------------
// Conservation
// ---------------------------------------------------------------------------

#[test]
fn lamports_are_conserved_across_the_lifecycle() {
    let mut h = Harness::new();
    let start = h.total_lamports();

    let vault = h.create_vault(1, DAY, 40_000, 500_000);
    assert_eq!(h.total_lamports(), start);

    h.ledger
        .execute(
            &h.owner.address(),
            Instruction::TopUpBounty {
                vault,
                amount: 10_000,
            },
        )
        .unwrap();
    assert_eq!(h.total_lamports(), start);

    h.ledger.clock().advance(DAY + 1);
    h.ledger
        .execute(&h.hunter.address(), Instruction::TriggerRelease { vault })
        .unwrap();
    assert_eq!(h.total_lamports(), start);

    h.ledger
        .execute(&h.recipient.address(), Instruction::ClaimSol { vault })
        .unwrap();
    assert_eq!(h.total_lamports(), start);
}
