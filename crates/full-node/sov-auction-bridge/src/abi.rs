//! Decoding of place-bid call payloads against a fixed schema.
//!
//! The [`SignatureTable`] maps 4-byte method selectors to the calls this
//! crate understands. Decoding is pure: the same table and bytes always
//! produce the same [`DecodedCall`] or [`DecodeError`].

use std::collections::HashMap;

use ethers_core::abi::{Abi, AbiParser, Function, ParamType, Token};
use ethers_core::types::U256;

/// Width of an ABI method selector.
pub const SELECTOR_LEN: usize = 4;

/// An ABI method selector.
pub type Selector = [u8; SELECTOR_LEN];

/// Name of the bid amount argument.
pub const BID_FIELD: &str = "bid";
/// Name of the bundle argument.
pub const TRANSACTIONS_FIELD: &str = "transactions";
/// Name of the timeout argument.
pub const TIMEOUT_FIELD: &str = "timeout";

/// Signature used when the configuration does not provide one.
pub const DEFAULT_BID_FUNCTION: &str =
    "function bid(uint256 bid, bytes[] transactions, uint64 timeout)";

/// Arguments of a place-bid call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceBidCall {
    /// Bid amount.
    pub bid: U256,
    /// Ordered bundle of opaque transactions.
    pub transactions: Vec<Vec<u8>>,
    /// Settlement timeout, interpreted by the auction.
    pub timeout: u64,
}

/// A successfully decoded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedCall {
    /// A call to the place-bid function.
    PlaceBid(PlaceBidCall),
}

/// Errors produced by [`SignatureTable::decode`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The selector is not in the table. Callers treat this as "not a call we know".
    #[error("unknown method selector 0x{}", hex::encode(.0))]
    UnknownSelector(Selector),
    /// The selector matched but the arguments do not decode against its layout.
    #[error("malformed `{method}` payload: {reason}")]
    MalformedPayload {
        /// Name of the matched method.
        method: String,
        /// Decoder diagnostic.
        reason: String,
    },
    /// An argument decoded, but not with the shape the call requires.
    #[error("field `{field}` of `{method}` must be {expected}")]
    InvalidFieldType {
        /// Name of the matched method.
        method: String,
        /// Offending argument.
        field: &'static str,
        /// Required shape.
        expected: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallKind {
    PlaceBid,
}

#[derive(Debug, Clone)]
struct KnownMethod {
    kind: CallKind,
    function: Function,
}

/// Selector lookup table for the calls the bridge understands.
#[derive(Debug, Clone)]
pub struct SignatureTable {
    methods: HashMap<Selector, KnownMethod>,
}

impl SignatureTable {
    /// Builds a table whose only entry is the given place-bid function.
    ///
    /// The function must declare arguments named `bid`, `transactions` and
    /// `timeout`. Their types are checked per call, so a mis-declared ABI
    /// surfaces as [`DecodeError::InvalidFieldType`].
    pub fn with_place_bid(function: Function) -> anyhow::Result<Self> {
        for field in [BID_FIELD, TRANSACTIONS_FIELD, TIMEOUT_FIELD] {
            if !function.inputs.iter().any(|param| param.name == field) {
                anyhow::bail!(
                    "place-bid function `{}` has no argument named `{}`",
                    function.signature(),
                    field
                );
            }
        }

        let mut methods = HashMap::new();
        methods.insert(
            function.short_signature(),
            KnownMethod {
                kind: CallKind::PlaceBid,
                function,
            },
        );
        Ok(Self { methods })
    }

    /// Returns the selector of the place-bid function.
    pub fn place_bid_selector(&self) -> Option<Selector> {
        self.methods
            .iter()
            .find(|(_, method)| method.kind == CallKind::PlaceBid)
            .map(|(selector, _)| *selector)
    }

    /// Returns the function registered under `selector`.
    pub fn function(&self, selector: &Selector) -> Option<&Function> {
        self.methods.get(selector).map(|method| &method.function)
    }

    /// Decodes `payload` (the call data following the selector).
    pub fn decode(&self, selector: Selector, payload: &[u8]) -> Result<DecodedCall, DecodeError> {
        let method = self
            .methods
            .get(&selector)
            .ok_or(DecodeError::UnknownSelector(selector))?;

        let tokens = method
            .function
            .decode_input(payload)
            .map_err(|e| DecodeError::MalformedPayload {
                method: method.function.name.clone(),
                reason: e.to_string(),
            })?;

        match method.kind {
            CallKind::PlaceBid => decode_place_bid(&method.function, tokens).map(DecodedCall::PlaceBid),
        }
    }
}

/// Splits call data into its selector and argument bytes.
///
/// Returns `None` when the data is too short to carry a selector.
pub fn split_selector(data: &[u8]) -> Option<(Selector, &[u8])> {
    if data.len() < SELECTOR_LEN {
        return None;
    }
    let (selector, args) = data.split_at(SELECTOR_LEN);
    let selector: Selector = selector.try_into().ok()?;
    Some((selector, args))
}

/// Parses a human-readable function signature such as
/// `function bid(uint256 bid, bytes[] transactions, uint64 timeout)`.
pub fn parse_function(signature: &str) -> anyhow::Result<Function> {
    Ok(AbiParser::default().parse_function(signature)?)
}

/// Looks up `method` in a JSON contract ABI.
pub fn function_from_abi_json(abi_json: &str, method: &str) -> anyhow::Result<Function> {
    let abi: Abi = serde_json::from_str(abi_json)?;
    Ok(abi.function(method)?.clone())
}

fn decode_place_bid(function: &Function, tokens: Vec<Token>) -> Result<PlaceBidCall, DecodeError> {
    let invalid = |field: &'static str, expected: &'static str| DecodeError::InvalidFieldType {
        method: function.name.clone(),
        field,
        expected,
    };

    let mut fields: HashMap<&str, (&ParamType, Token)> = function
        .inputs
        .iter()
        .zip(tokens)
        .map(|(param, token)| (param.name.as_str(), (&param.kind, token)))
        .collect();

    let bid = match fields.remove(BID_FIELD) {
        Some((ParamType::Uint(_), Token::Uint(bid))) => bid,
        _ => return Err(invalid(BID_FIELD, "an unsigned integer")),
    };

    let transactions = match fields.remove(TRANSACTIONS_FIELD) {
        Some((ParamType::Array(inner), Token::Array(items)))
            if matches!(inner.as_ref(), ParamType::Bytes) =>
        {
            items
                .into_iter()
                .map(|item| match item {
                    Token::Bytes(bytes) => Ok(bytes),
                    _ => Err(invalid(TRANSACTIONS_FIELD, "a sequence of byte strings")),
                })
                .collect::<Result<Vec<_>, _>>()?
        }
        _ => return Err(invalid(TRANSACTIONS_FIELD, "a sequence of byte strings")),
    };

    let timeout = match fields.remove(TIMEOUT_FIELD) {
        Some((ParamType::Uint(bits), Token::Uint(timeout)))
            if *bits <= 64 && timeout <= U256::from(u64::MAX) =>
        {
            timeout.as_u64()
        }
        _ => return Err(invalid(TIMEOUT_FIELD, "an unsigned 64-bit integer")),
    };

    Ok(PlaceBidCall {
        bid,
        transactions,
        timeout,
    })
}
