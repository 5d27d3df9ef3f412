//! Transaction Classifier
//!
//! Decides whether a decoded transaction is a new token mint or a new
//! liquidity pool, and extracts the candidate mint address.
//!
//! Classification is a two-pass scan over the instruction list:
//! 1. The first token-program instruction carrying an initialize-mint opcode
//!    wins; its first account is the mint.
//! 2. Otherwise, a pool-creation instruction of a configured liquidity program
//!    yields the first non-signer, non-reserved account at positions 3..=6.
//!
//! The pool heuristic is best-effort: account layouts differ between program
//! versions and the selected key may not be the new mint.

use base64::{engine::general_purpose::STANDARD, Engine};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::transaction::VersionedTransaction;
use tracing::{debug, warn};

use crate::domain::candidate::SourceType;
use crate::domain::known_programs::{
    is_reserved_address, pool_rule_for, Opcode, ProgramRule, POOL_CREATION_RULES,
    TOKEN_MINT_RULES,
};

/// Account positions scanned for the pool-creation mint
const POOL_MINT_KEY_RANGE: std::ops::RangeInclusive<usize> = 3..=6;

/// One account reference of an instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstructionAccount {
    pub pubkey: Pubkey,
    pub is_signer: bool,
}

/// Decoded instruction. Accounts that cannot be resolved from the
/// transaction itself (address lookup tables) are `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionView {
    pub program_id: Pubkey,
    pub data: Vec<u8>,
    pub accounts: Vec<Option<InstructionAccount>>,
}

impl InstructionView {
    fn account(&self, index: usize) -> Option<&InstructionAccount> {
        self.accounts.get(index).and_then(|a| a.as_ref())
    }
}

/// Result of classifying one transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    TokenCreation { mint: Pubkey },
    PoolCreation { mint: Pubkey },
    Unrecognized,
}

impl Classification {
    /// Mint address and source, if the transaction is a candidate
    pub fn candidate(&self) -> Option<(String, SourceType)> {
        match self {
            Classification::TokenCreation { mint } => {
                Some((mint.to_string(), SourceType::TokenCreation))
            }
            Classification::PoolCreation { mint } => {
                Some((mint.to_string(), SourceType::PoolCreation))
            }
            Classification::Unrecognized => None,
        }
    }
}

#[derive(Debug, Clone)]
struct CompiledRule {
    name: &'static str,
    program_id: Pubkey,
    opcodes: &'static [Opcode],
}

impl CompiledRule {
    fn matches(&self, ix: &InstructionView) -> bool {
        ix.program_id == self.program_id && self.opcodes.iter().any(|op| op.matches(&ix.data))
    }
}

/// Decision-table classifier
#[derive(Debug, Clone)]
pub struct TransactionClassifier {
    mint_rules: Vec<CompiledRule>,
    pool_rules: Vec<CompiledRule>,
}

impl TransactionClassifier {
    /// Classifier recognizing every known pool program
    pub fn new() -> Self {
        Self {
            mint_rules: compile(TOKEN_MINT_RULES.iter()),
            pool_rules: compile(POOL_CREATION_RULES.iter()),
        }
    }

    /// Classifier restricted to the given liquidity program ids.
    ///
    /// Unknown ids are skipped with a warning.
    pub fn with_pool_programs(program_ids: &[String]) -> Self {
        let rules = program_ids.iter().filter_map(|id| {
            let rule = pool_rule_for(id);
            if rule.is_none() {
                warn!(program_id = %id, "Unknown pool program, ignoring");
            }
            rule
        });

        Self {
            mint_rules: compile(TOKEN_MINT_RULES.iter()),
            pool_rules: compile(rules),
        }
    }

    /// Names of the active pool-creation rules
    pub fn pool_program_names(&self) -> Vec<&'static str> {
        self.pool_rules.iter().map(|r| r.name).collect()
    }

    /// Classify an ordered instruction list
    pub fn classify(&self, instructions: &[InstructionView]) -> Classification {
        // Pass 1: mint initialization, first match wins and ends the pass
        let first_mint = instructions
            .iter()
            .find(|ix| self.mint_rules.iter().any(|rule| rule.matches(ix)));
        if let Some(ix) = first_mint {
            match ix.account(0) {
                Some(mint) => return Classification::TokenCreation { mint: mint.pubkey },
                None => {
                    debug!(program_id = %ix.program_id, "Mint initialization without a resolvable mint account")
                }
            }
        }

        // Pass 2: pool creation
        for ix in instructions {
            if !self.pool_rules.iter().any(|rule| rule.matches(ix)) {
                continue;
            }

            let mint = POOL_MINT_KEY_RANGE
                .filter_map(|i| ix.account(i))
                .find(|acc| !acc.is_signer && !is_reserved_address(&acc.pubkey));

            if let Some(acc) = mint {
                return Classification::PoolCreation { mint: acc.pubkey };
            }
        }

        Classification::Unrecognized
    }

    /// Decode and classify a base64 transaction payload.
    ///
    /// Undecodable payloads are `Unrecognized`.
    pub fn classify_encoded(&self, encoded: &str) -> Classification {
        match decode_transaction(encoded) {
            Some(instructions) => self.classify(&instructions),
            None => Classification::Unrecognized,
        }
    }
}

impl Default for TransactionClassifier {
    fn default() -> Self {
        Self::new()
    }
}

fn compile<'a>(rules: impl Iterator<Item = &'a ProgramRule>) -> Vec<CompiledRule> {
    rules
        .filter_map(|rule| {
            rule.pubkey().map(|program_id| CompiledRule {
                name: rule.name,
                program_id,
                opcodes: rule.opcodes,
            })
        })
        .collect()
}

/// Decode a base64 bincode `VersionedTransaction` into instruction views
pub fn decode_transaction(encoded: &str) -> Option<Vec<InstructionView>> {
    let bytes = match STANDARD.decode(encoded.trim()) {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!(error = %e, "Transaction payload is not valid base64");
            return None;
        }
    };

    let tx: VersionedTransaction = match bincode::deserialize(&bytes) {
        Ok(tx) => tx,
        Err(e) => {
            debug!(error = %e, "Transaction payload is not a versioned transaction");
            return None;
        }
    };

    Some(instruction_views(&tx))
}

/// Resolve compiled instructions against the static account keys
pub fn instruction_views(tx: &VersionedTransaction) -> Vec<InstructionView> {
    let keys = tx.message.static_account_keys();
    let num_signers = tx.message.header().num_required_signatures as usize;

    let resolve = |index: u8| -> Option<InstructionAccount> {
        let index = index as usize;
        keys.get(index).map(|pubkey| InstructionAccount {
            pubkey: *pubkey,
            is_signer: index < num_signers,
        })
    };

    tx.message
        .instructions()
        .iter()
        .filter_map(|ix| {
            let program_id = *keys.get(ix.program_id_index as usize)?;
            Some(InstructionView {
                program_id,
                data: ix.data.clone(),
                accounts: ix.accounts.iter().map(|i| resolve(*i)).collect(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::known_programs::{
        RAYDIUM_AMM_V4_PROGRAM, RAYDIUM_CPMM_PROGRAM, SPL_TOKEN_2022_PROGRAM, SPL_TOKEN_PROGRAM,
        WSOL_MINT,
    };
    use solana_sdk::instruction::{AccountMeta, Instruction};
    use solana_sdk::message::Message;
    use solana_sdk::transaction::Transaction;
    use std::str::FromStr;

    fn pk(s: &str) -> Pubkey {
        Pubkey::from_str(s).unwrap()
    }

    fn account(pubkey: Pubkey, is_signer: bool) -> Option<InstructionAccount> {
        Some(InstructionAccount { pubkey, is_signer })
    }

    fn ix(program: &str, data: Vec<u8>, accounts: Vec<Option<InstructionAccount>>) -> InstructionView {
        InstructionView {
            program_id: pk(program),
            data,
            accounts,
        }
    }

    fn noise() -> InstructionView {
        ix(
            "ComputeBudget111111111111111111111111111111",
            vec![2, 0, 0, 0, 0],
            vec![],
        )
    }

    fn amm_accounts(slots: [Option<InstructionAccount>; 7]) -> Vec<Option<InstructionAccount>> {
        slots.to_vec()
    }

    #[test]
    fn test_mint_initialization_at_index_two() {
        let mint = Pubkey::new_unique();
        let instructions = vec![
            noise(),
            noise(),
            ix(SPL_TOKEN_PROGRAM, vec![0, 6], vec![account(mint, false)]),
        ];

        let result = TransactionClassifier::new().classify(&instructions);
        assert_eq!(result, Classification::TokenCreation { mint });
        assert_eq!(
            result.candidate(),
            Some((mint.to_string(), SourceType::TokenCreation))
        );
    }

    #[test]
    fn test_first_mint_wins() {
        let first = Pubkey::new_unique();
        let second = Pubkey::new_unique();
        let instructions = vec![
            ix(SPL_TOKEN_2022_PROGRAM, vec![20, 9], vec![account(first, false)]),
            ix(SPL_TOKEN_PROGRAM, vec![0, 6], vec![account(second, false)]),
        ];

        let result = TransactionClassifier::new().classify(&instructions);
        assert_eq!(result, Classification::TokenCreation { mint: first });
    }

    #[test]
    fn test_unresolvable_first_mint_stops_mint_pass() {
        let later = Pubkey::new_unique();
        let instructions = vec![
            ix(SPL_TOKEN_PROGRAM, vec![0, 6], vec![None]),
            ix(SPL_TOKEN_2022_PROGRAM, vec![20, 9], vec![account(later, false)]),
        ];

        assert_eq!(
            TransactionClassifier::new().classify(&instructions),
            Classification::Unrecognized
        );
    }

    #[test]
    fn test_token_transfer_is_not_a_mint() {
        // Transfer (3) on the token program
        let instructions = vec![ix(
            SPL_TOKEN_PROGRAM,
            vec![3, 1, 0, 0, 0, 0, 0, 0, 0],
            vec![account(Pubkey::new_unique(), false)],
        )];

        assert_eq!(
            TransactionClassifier::new().classify(&instructions),
            Classification::Unrecognized
        );
    }

    #[test]
    fn test_mint_takes_precedence_over_pool() {
        let pool_mint = Pubkey::new_unique();
        let token_mint = Pubkey::new_unique();
        let payer = Pubkey::new_unique();
        let instructions = vec![
            ix(
                RAYDIUM_AMM_V4_PROGRAM,
                vec![1],
                amm_accounts([
                    account(payer, true),
                    None,
                    None,
                    account(pool_mint, false),
                    None,
                    None,
                    None,
                ]),
            ),
            ix(SPL_TOKEN_PROGRAM, vec![0], vec![account(token_mint, false)]),
        ];

        let result = TransactionClassifier::new().classify(&instructions);
        assert_eq!(result, Classification::TokenCreation { mint: token_mint });
    }

    #[test]
    fn test_pool_skips_signers_and_reserved_keys() {
        let payer = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let filler = Pubkey::new_unique();
        let instructions = vec![ix(
            RAYDIUM_AMM_V4_PROGRAM,
            vec![1, 254],
            amm_accounts([
                account(filler, false),
                account(filler, false),
                account(filler, false),
                account(payer, true),
                account(pk(WSOL_MINT), false),
                account(pk(SPL_TOKEN_PROGRAM), false),
                account(mint, false),
            ]),
        )];

        let result = TransactionClassifier::new().classify(&instructions);
        assert_eq!(result, Classification::PoolCreation { mint });
    }

    #[test]
    fn test_pool_key_outside_range_is_ignored() {
        let mint = Pubkey::new_unique();
        let mut accounts = vec![account(Pubkey::new_unique(), true); 7];
        accounts.push(account(mint, false));
        let instructions = vec![ix(RAYDIUM_AMM_V4_PROGRAM, vec![1], accounts)];

        assert_eq!(
            TransactionClassifier::new().classify(&instructions),
            Classification::Unrecognized
        );
    }

    #[test]
    fn test_cpmm_discriminator() {
        let mint = Pubkey::new_unique();
        let mut data = vec![175, 175, 109, 31, 13, 152, 155, 237];
        data.extend_from_slice(&[0; 16]);
        let mut accounts = vec![account(Pubkey::new_unique(), true); 3];
        accounts.push(account(mint, false));
        let instructions = vec![ix(RAYDIUM_CPMM_PROGRAM, data, accounts)];

        assert_eq!(
            TransactionClassifier::new().classify(&instructions),
            Classification::PoolCreation { mint }
        );
    }

    #[test]
    fn test_restricted_pool_programs() {
        let classifier = TransactionClassifier::with_pool_programs(&[
            RAYDIUM_CPMM_PROGRAM.to_string(),
            "NotARealProgram".to_string(),
        ]);
        assert_eq!(classifier.pool_program_names(), vec!["raydium-cpmm"]);

        let mut accounts = vec![account(Pubkey::new_unique(), true); 3];
        accounts.push(account(Pubkey::new_unique(), false));
        let instructions = vec![ix(RAYDIUM_AMM_V4_PROGRAM, vec![0], accounts)];
        assert_eq!(classifier.classify(&instructions), Classification::Unrecognized);
    }

    #[test]
    fn test_empty_transaction() {
        assert_eq!(
            TransactionClassifier::new().classify(&[]),
            Classification::Unrecognized
        );
    }

    #[test]
    fn test_decode_and_classify_wire_transaction() {
        let payer = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let token_program = pk(SPL_TOKEN_PROGRAM);
        let rent = pk("SysvarRent111111111111111111111111111111111");

        let init_mint = Instruction::new_with_bytes(
            token_program,
            &[0, 6],
            vec![AccountMeta::new(mint, false), AccountMeta::new_readonly(rent, false)],
        );
        let message = Message::new(&[init_mint], Some(&payer));
        let tx = VersionedTransaction::from(Transaction::new_unsigned(message));
        let encoded = STANDARD.encode(bincode::serialize(&tx).unwrap());

        let views = decode_transaction(&encoded).unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].program_id, token_program);
        assert_eq!(views[0].accounts[0], account(mint, false));

        let result = TransactionClassifier::new().classify_encoded(&encoded);
        assert_eq!(result, Classification::TokenCreation { mint });
    }

    #[test]
    fn test_garbage_payload_is_unrecognized() {
        let classifier = TransactionClassifier::new();
        assert_eq!(classifier.classify_encoded("not base64 !!"), Classification::Unrecognized);
        assert_eq!(
            classifier.classify_encoded(&STANDARD.encode([1u8, 2, 3])),
            Classification::Unrecognized
        );
    }
}
