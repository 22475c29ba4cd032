//! Legacy transaction compilation, signing and serialization.
//!
//! # Wire Format
//!
//! ```text
//! transaction:
//!   [compact-u16 n][n x 64-byte signature]
//!   [message]
//!
//! message:
//!   [num_required_signatures: u8]
//!   [num_readonly_signed: u8]
//!   [num_readonly_unsigned: u8]
//!   [compact-u16 k][k x 32-byte account key]
//!   [32-byte recent blockhash]
//!   [compact-u16 m][m x compiled instruction]
//!
//! compiled instruction:
//!   [program_id_index: u8]
//!   [compact-u16 a][a x account index: u8]
//!   [compact-u16 d][d bytes data]
//! ```
//!
//! Account keys are ordered signer-writable, signer-readonly,
//! nonsigner-writable, nonsigner-readonly, with the fee payer first.

use agentwallet_crypto::{Hash, Keypair, Pubkey, Signature};

use crate::borsh::BorshReader;
use crate::error::{WireError, WireResult};
use crate::instruction::Instruction;

/// Largest number of distinct accounts a legacy message can index.
const MAX_ACCOUNT_KEYS: usize = 256;

/// Append `value` as a compact-u16 (7 bits per byte, high bit = continue).
pub fn encode_compact_u16(value: u16, out: &mut Vec<u8>) {
    let mut rem = value;
    loop {
        let mut byte = (rem & 0x7f) as u8;
        rem >>= 7;
        if rem == 0 {
            out.push(byte);
            return;
        }
        byte |= 0x80;
        out.push(byte);
    }
}

/// Read a compact-u16 from `reader`.
pub fn decode_compact_u16(reader: &mut BorshReader<'_>, field: &'static str) -> WireResult<u16> {
    let mut value: u32 = 0;
    for i in 0..3 {
        let byte = reader.u8(field)?;
        value |= u32::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            return u16::try_from(value)
                .map_err(|_| WireError::InvalidTransaction(format!("{} overflows u16", field)));
        }
    }
    Err(WireError::InvalidTransaction(format!("{} is not a compact-u16", field)))
}

fn encode_len(len: usize, out: &mut Vec<u8>) -> WireResult<()> {
    let len = u16::try_from(len)
        .map_err(|_| WireError::InvalidTransaction(format!("length {} exceeds u16", len)))?;
    encode_compact_u16(len, out);
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MessageHeader {
    pub num_required_signatures: u8,
    pub num_readonly_signed_accounts: u8,
    pub num_readonly_unsigned_accounts: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledInstruction {
    pub program_id_index: u8,
    pub accounts: Vec<u8>,
    pub data: Vec<u8>,
}

/// A compiled legacy message: what signers actually sign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub header: MessageHeader,
    pub account_keys: Vec<Pubkey>,
    pub recent_blockhash: Hash,
    pub instructions: Vec<CompiledInstruction>,
}

#[derive(Debug, Clone, Copy)]
struct KeyFlags {
    pubkey: Pubkey,
    is_signer: bool,
    is_writable: bool,
}

impl Message {
    /// Compile `instructions` with `payer` as fee payer.
    pub fn new(instructions: &[Instruction], payer: &Pubkey, recent_blockhash: Hash) -> WireResult<Self> {
        if instructions.is_empty() {
            return Err(WireError::InvalidTransaction("no instructions".into()));
        }

        // Merge every referenced key, keeping first-seen order.
        let mut keys: Vec<KeyFlags> = vec![KeyFlags {
            pubkey: *payer,
            is_signer: true,
            is_writable: true,
        }];
        let mut upsert = |pubkey: Pubkey, is_signer: bool, is_writable: bool| {
            if let Some(existing) = keys.iter_mut().find(|k| k.pubkey == pubkey) {
                existing.is_signer |= is_signer;
                existing.is_writable |= is_writable;
            } else {
                keys.push(KeyFlags {
                    pubkey,
                    is_signer,
                    is_writable,
                });
            }
        };
        for ix in instructions {
            for meta in &ix.accounts {
                upsert(meta.pubkey, meta.is_signer, meta.is_writable);
            }
            upsert(ix.program_id, false, false);
        }

        // Stable partition into the four groups; the payer stays first.
        let rank = |k: &KeyFlags| match (k.is_signer, k.is_writable) {
            (true, true) => 0,
            (true, false) => 1,
            (false, true) => 2,
            (false, false) => 3,
        };
        let payer_flags = keys.remove(0);
        keys.sort_by_key(rank);
        keys.insert(0, payer_flags);

        if keys.len() > MAX_ACCOUNT_KEYS {
            return Err(WireError::InvalidTransaction(format!(
                "{} account keys exceeds {}",
                keys.len(),
                MAX_ACCOUNT_KEYS
            )));
        }

        let header = MessageHeader {
            num_required_signatures: keys.iter().filter(|k| k.is_signer).count() as u8,
            num_readonly_signed_accounts: keys.iter().filter(|k| k.is_signer && !k.is_writable).count() as u8,
            num_readonly_unsigned_accounts: keys.iter().filter(|k| !k.is_signer && !k.is_writable).count()
                as u8,
        };
        let account_keys: Vec<Pubkey> = keys.iter().map(|k| k.pubkey).collect();
        let index_of = |pubkey: &Pubkey| -> u8 {
            // Every key was inserted above, and there are at most 256 of them.
            account_keys.iter().position(|k| k == pubkey).unwrap_or_default() as u8
        };

        let compiled = instructions
            .iter()
            .map(|ix| CompiledInstruction {
                program_id_index: index_of(&ix.program_id),
                accounts: ix.accounts.iter().map(|m| index_of(&m.pubkey)).collect(),
                data: ix.data.clone(),
            })
            .collect();

        Ok(Self {
            header,
            account_keys,
            recent_blockhash,
            instructions: compiled,
        })
    }

    /// Parse a serialized message.
    pub fn deserialize(bytes: &[u8]) -> WireResult<Self> {
        let mut reader = BorshReader::new(bytes);
        let message = Self::read(&mut reader)?;
        if reader.remaining() != 0 {
            return Err(WireError::InvalidTransaction(format!(
                "{} trailing bytes after message",
                reader.remaining()
            )));
        }
        Ok(message)
    }

    fn read(reader: &mut BorshReader<'_>) -> WireResult<Self> {
        let header = MessageHeader {
            num_required_signatures: reader.u8("num_required_signatures")?,
            num_readonly_signed_accounts: reader.u8("num_readonly_signed_accounts")?,
            num_readonly_unsigned_accounts: reader.u8("num_readonly_unsigned_accounts")?,
        };
        let key_count = decode_compact_u16(reader, "account_keys")?;
        let account_keys = (0..key_count)
            .map(|_| reader.pubkey("account_key"))
            .collect::<WireResult<Vec<_>>>()?;
        let mut blockhash = [0u8; 32];
        blockhash.copy_from_slice(reader.bytes("recent_blockhash", 32)?);

        let ix_count = decode_compact_u16(reader, "instructions")?;
        let mut instructions = Vec::with_capacity(ix_count as usize);
        for _ in 0..ix_count {
            let program_id_index = reader.u8("program_id_index")?;
            let accounts_len = decode_compact_u16(reader, "instruction_accounts")?;
            let accounts = reader.bytes("instruction_accounts", accounts_len as usize)?.to_vec();
            let data_len = decode_compact_u16(reader, "instruction_data")?;
            let data = reader.bytes("instruction_data", data_len as usize)?.to_vec();
            if program_id_index as usize >= account_keys.len()
                || accounts.iter().any(|&i| i as usize >= account_keys.len())
            {
                return Err(WireError::InvalidTransaction("account index out of range".into()));
            }
            instructions.push(CompiledInstruction {
                program_id_index,
                accounts,
                data,
            });
        }

        Ok(Self {
            header,
            account_keys,
            recent_blockhash: Hash(blockhash),
            instructions,
        })
    }

    /// Program id of each compiled instruction, in order.
    pub fn program_ids(&self) -> Vec<Pubkey> {
        self.instructions
            .iter()
            .map(|ix| self.account_keys[ix.program_id_index as usize])
            .collect()
    }

    /// Keys that must sign, in signature order.
    pub fn signer_keys(&self) -> &[Pubkey] {
        &self.account_keys[..self.header.num_required_signatures as usize]
    }

    pub fn serialize(&self) -> WireResult<Vec<u8>> {
        let mut out = Vec::with_capacity(256);
        out.push(self.header.num_required_signatures);
        out.push(self.header.num_readonly_signed_accounts);
        out.push(self.header.num_readonly_unsigned_accounts);

        encode_len(self.account_keys.len(), &mut out)?;
        for key in &self.account_keys {
            out.extend_from_slice(key.as_bytes());
        }
        out.extend_from_slice(&self.recent_blockhash.0);

        encode_len(self.instructions.len(), &mut out)?;
        for ix in &self.instructions {
            out.push(ix.program_id_index);
            encode_len(ix.accounts.len(), &mut out)?;
            out.extend_from_slice(&ix.accounts);
            encode_len(ix.data.len(), &mut out)?;
            out.extend_from_slice(&ix.data);
        }
        Ok(out)
    }
}

/// A signed legacy transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub signatures: Vec<Signature>,
    pub message: Message,
}

impl Transaction {
    /// Sign `message` with `signers`. Every required signer must be present;
    /// extra keypairs are ignored.
    pub fn sign(message: Message, signers: &[&Keypair]) -> WireResult<Self> {
        let payload = message.serialize()?;
        let signatures = message
            .signer_keys()
            .iter()
            .map(|key| {
                signers
                    .iter()
                    .find(|kp| kp.pubkey() == *key)
                    .map(|kp| kp.sign(&payload))
                    .ok_or_else(|| WireError::MissingSigner(key.to_string()))
            })
            .collect::<WireResult<Vec<_>>>()?;
        Ok(Self { signatures, message })
    }

    /// Compile and sign in one step with `payer` paying fees.
    pub fn new_signed(
        instructions: &[Instruction],
        payer: &Keypair,
        recent_blockhash: Hash,
    ) -> WireResult<Self> {
        let message = Message::new(instructions, &payer.pubkey(), recent_blockhash)?;
        Self::sign(message, &[payer])
    }

    /// The fee payer's signature, which is also the transaction id.
    pub fn signature(&self) -> Signature {
        self.signatures.first().copied().unwrap_or_default()
    }

    pub fn serialize(&self) -> WireResult<Vec<u8>> {
        let mut out = Vec::new();
        encode_len(self.signatures.len(), &mut out)?;
        for sig in &self.signatures {
            out.extend_from_slice(sig.as_bytes());
        }
        out.extend_from_slice(&self.message.serialize()?);
        Ok(out)
    }

    /// Parse a serialized transaction. Signatures are not verified.
    pub fn deserialize(bytes: &[u8]) -> WireResult<Self> {
        let mut reader = BorshReader::new(bytes);
        let count = decode_compact_u16(&mut reader, "signatures")?;
        let signatures = (0..count)
            .map(|_| {
                let mut sig = [0u8; 64];
                sig.copy_from_slice(reader.bytes("signature", 64)?);
                Ok(Signature::from_bytes(sig))
            })
            .collect::<WireResult<Vec<_>>>()?;
        let message = Message::read(&mut reader)?;
        if reader.remaining() != 0 {
            return Err(WireError::InvalidTransaction("trailing bytes after transaction".into()));
        }
        Ok(Self { signatures, message })
    }

    /// True when every signature verifies against its signer key.
    pub fn verify(&self) -> bool {
        let Ok(payload) = self.message.serialize() else {
            return false;
        };
        let signers = self.message.signer_keys();
        signers.len() == self.signatures.len()
            && signers
                .iter()
                .zip(&self.signatures)
                .all(|(key, sig)| key.verify(&payload, sig))
    }

    /// Base58 form accepted by `sendTransaction` with `encoding: base58`.
    pub fn to_base58(&self) -> WireResult<String> {
        Ok(bs58::encode(self.serialize()?).into_string())
    }
}
