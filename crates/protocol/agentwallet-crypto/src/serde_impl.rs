//! Serde support: keys, signatures and hashes serialize as base58 strings.

use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Hash, Pubkey, Signature};

struct Base58Visitor<T>(PhantomData<T>);

impl<'de, T> Visitor<'de> for Base58Visitor<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    type Value = T;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a base58 encoded string")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<T, E> {
        T::from_str(v).map_err(E::custom)
    }
}

macro_rules! base58_serde {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                deserializer.deserialize_str(Base58Visitor::<$ty>(PhantomData))
            }
        }
    };
}

base58_serde!(Pubkey);
base58_serde!(Signature);
base58_serde!(Hash);

#[cfg(test)]
mod tests {
    use crate::{Keypair, Pubkey};

    #[test]
    fn test_pubkey_serializes_as_string() {
        let key = Keypair::generate().pubkey();
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, format!("\"{}\"", key));
        let back: Pubkey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }

    #[test]
    fn test_invalid_pubkey_string_rejected() {
        assert!(serde_json::from_str::<Pubkey>("\"not-a-key\"").is_err());
        assert!(serde_json::from_str::<Pubkey>("42").is_err());
    }
}
