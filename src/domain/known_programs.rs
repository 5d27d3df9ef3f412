//! Known Program Addresses
//!
//! Constants for the Solana programs the classifier recognizes, the opcodes
//! that mark mint initialization and pool creation, and the reserved
//! addresses that can never be a candidate mint.

use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;

/// SPL Token program
pub const SPL_TOKEN_PROGRAM: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
/// SPL Token-2022 program
pub const SPL_TOKEN_2022_PROGRAM: &str = "TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb";
/// Raydium AMM v4
pub const RAYDIUM_AMM_V4_PROGRAM: &str = "675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8";
/// Raydium CP (Constant Product)
pub const RAYDIUM_CPMM_PROGRAM: &str = "CPMMoo8L3F4NbTegBCKVNunggL7H1ZpdTHKxQB5qKP1C";

/// Native SOL mint (wrapped SOL)
pub const WSOL_MINT: &str = "So11111111111111111111111111111111111111112";

/// Instruction opcode as encoded in the first bytes of instruction data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    /// Single-byte instruction tag (native programs, Raydium AMM v4)
    Tag(u8),
    /// 8-byte Anchor instruction discriminator
    Discriminator([u8; 8]),
}

impl Opcode {
    /// Check whether instruction data starts with this opcode
    pub fn matches(&self, data: &[u8]) -> bool {
        match self {
            Opcode::Tag(tag) => data.first() == Some(tag),
            Opcode::Discriminator(disc) => data.len() >= 8 && data[..8] == disc[..],
        }
    }
}

/// A program id together with the opcodes that make an instruction relevant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramRule {
    pub name: &'static str,
    pub program_id: &'static str,
    pub opcodes: &'static [Opcode],
}

impl ProgramRule {
    /// Parse the program id
    pub fn pubkey(&self) -> Option<Pubkey> {
        Pubkey::from_str(self.program_id).ok()
    }
}

/// InitializeMint (0) and InitializeMint2 (20) share layout across both token programs
const INITIALIZE_MINT_OPCODES: &[Opcode] = &[Opcode::Tag(0), Opcode::Tag(20)];

/// Token programs whose mint initialization marks a token creation
pub const TOKEN_MINT_RULES: &[ProgramRule] = &[
    ProgramRule {
        name: "spl-token",
        program_id: SPL_TOKEN_PROGRAM,
        opcodes: INITIALIZE_MINT_OPCODES,
    },
    ProgramRule {
        name: "spl-token-2022",
        program_id: SPL_TOKEN_2022_PROGRAM,
        opcodes: INITIALIZE_MINT_OPCODES,
    },
];

/// Liquidity programs whose pool initialization marks a new tradable token
pub const POOL_CREATION_RULES: &[ProgramRule] = &[
    ProgramRule {
        name: "raydium-amm-v4",
        program_id: RAYDIUM_AMM_V4_PROGRAM,
        // Initialize, Initialize2
        opcodes: &[Opcode::Tag(0), Opcode::Tag(1)],
    },
    ProgramRule {
        name: "raydium-cpmm",
        program_id: RAYDIUM_CPMM_PROGRAM,
        // sha256("global:initialize")[..8]
        opcodes: &[Opcode::Discriminator([175, 175, 109, 31, 13, 152, 155, 237])],
    },
];

/// System programs and sysvars that are never token mints
pub const RESERVED_ADDRESSES: &[&str] = &[
    // System Program
    "11111111111111111111111111111111",
    SPL_TOKEN_PROGRAM,
    SPL_TOKEN_2022_PROGRAM,
    // Associated Token Account Program
    "ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL",
    // Compute Budget Program
    "ComputeBudget111111111111111111111111111111",
    // Address Lookup Table Program
    "AddressLookupTab1e1111111111111111111111111",
    // Rent sysvar
    "SysvarRent111111111111111111111111111111111",
    // Clock sysvar
    "SysvarC1ock11111111111111111111111111111111",
    // Serum / OpenBook DEX v3 (market accounts of AMM v4 pools)
    "srmqPvymJeFKQ4zGQed1GFppgkRHB6kMDzpZjsw2BiW",
    WSOL_MINT,
];

/// Look up a pool rule by program id
pub fn pool_rule_for(program_id: &str) -> Option<&'static ProgramRule> {
    POOL_CREATION_RULES.iter().find(|r| r.program_id == program_id)
}

/// Program ids the stream manager subscribes to by default
pub fn default_subscription_programs() -> Vec<String> {
    TOKEN_MINT_RULES
        .iter()
        .chain(POOL_CREATION_RULES.iter())
        .map(|r| r.program_id.to_string())
        .collect()
}

/// Check if a pubkey is reserved (system program, sysvar, or a known program id)
pub fn is_reserved_address(pubkey: &Pubkey) -> bool {
    let pubkey_str = pubkey.to_string();
    RESERVED_ADDRESSES.contains(&pubkey_str.as_str())
        || TOKEN_MINT_RULES
            .iter()
            .chain(POOL_CREATION_RULES.iter())
            .any(|r| r.program_id == pubkey_str)
}
