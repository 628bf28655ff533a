//! Typed registers.
//!
//! A [`TypedRegister`] describes one logical value at a fixed offset inside a
//! node's address block. The absolute bus address is the node's base address
//! plus the offset:
//!
//! ```text
//! node base 20 ──┬─ offset 0 ─→ input 20  module kind
//!                ├─ offset 3 ─→ input 23  temperature (raw / 10)
//!                └─ offset 9 ─→ input 29  location number
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::snapshot::RegisterSnapshot;
use crate::transport::RegisterTransport;

/// Bus address of a single register. Only unique within an [`AccessClass`].
pub type RegisterAddress = u16;

/// Raw 16-bit register content.
pub type RawValue = u16;

/// Converts a raw register value into a typed value.
pub type Decoder<V> = fn(RawValue) -> V;

/// Converts a typed value into a raw register value.
///
/// Returns `None` when the value has no raw representation.
pub type Encoder<V> = fn(&V) -> Option<RawValue>;

/// Register access class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessClass {
    /// Input register (read-only)
    Input,
    /// Holding register (read-write)
    Holding,
}

impl AccessClass {
    /// Both classes, in refresh order.
    pub const ALL: [AccessClass; 2] = [AccessClass::Input, AccessClass::Holding];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Holding => "holding",
        }
    }
}

impl fmt::Display for AccessClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One logical value at a fixed offset within a node's address block.
///
/// Decoders and encoders are plain function pointers so catalogues of
/// registers can be declared as `static` items.
pub struct TypedRegister<V> {
    offset: u16,
    class: AccessClass,
    decode: Option<Decoder<V>>,
    encode: Option<Encoder<V>>,
}

impl<V> TypedRegister<V> {
    /// Create a read-only input register.
    pub const fn input(offset: u16, decode: Decoder<V>) -> Self {
        Self {
            offset,
            class: AccessClass::Input,
            decode: Some(decode),
            encode: None,
        }
    }

    /// Create a read-write holding register.
    pub const fn holding(offset: u16, decode: Decoder<V>, encode: Encoder<V>) -> Self {
        Self {
            offset,
            class: AccessClass::Holding,
            decode: Some(decode),
            encode: Some(encode),
        }
    }

    /// Create a holding register that only accepts commands and is never read back.
    pub const fn write_only(offset: u16, encode: Encoder<V>) -> Self {
        Self {
            offset,
            class: AccessClass::Holding,
            decode: None,
            encode: Some(encode),
        }
    }

    pub fn offset(&self) -> u16 {
        self.offset
    }

    pub fn class(&self) -> AccessClass {
        self.class
    }

    pub fn is_readable(&self) -> bool {
        self.decode.is_some()
    }

    pub fn is_writable(&self) -> bool {
        self.encode.is_some()
    }

    /// Absolute address of this register for the node at `base`.
    ///
    /// No bounds validation happens here; out-of-range addresses are the
    /// transport's concern.
    pub fn address(&self, base: RegisterAddress) -> RegisterAddress {
        base.wrapping_add(self.offset)
    }

    /// Decode a raw value. `None` for write-only registers.
    pub fn decode(&self, raw: RawValue) -> Option<V> {
        self.decode.map(|decode| decode(raw))
    }

    /// Read the value for the node at `base` from a snapshot.
    ///
    /// Returns `None` when the address was not part of the last successful
    /// read or the register has no decoder.
    pub fn read_from(&self, snapshot: &RegisterSnapshot, base: RegisterAddress) -> Option<V> {
        snapshot
            .get(self.class, self.address(base))
            .and_then(|raw| self.decode(raw))
    }

    /// Read the register straight from the bus, bypassing any snapshot.
    ///
    /// A missing or rejected value is `Ok(None)`; only an unreachable
    /// transport is an error.
    pub async fn read_direct(
        &self,
        transport: &dyn RegisterTransport,
        base: RegisterAddress,
    ) -> Result<Option<V>> {
        let address = self.address(base);
        match transport.read_registers(address, 1, self.class).await {
            Ok(values) => {
                debug!(
                    "read register {}[{}]={:?}",
                    self.class,
                    address,
                    values.first()
                );
                Ok(values.first().and_then(|raw| self.decode(*raw)))
            }
            Err(e) if e.is_unreachable() => Err(e.into()),
            Err(e) => {
                debug!("read register {}[{}] failed: {}", self.class, address, e);
                Ok(None)
            }
        }
    }
}

impl<V: fmt::Debug> TypedRegister<V> {
    /// Encode a value for writing.
    ///
    /// Fails with [`Error::NotWritable`] when the register has no encoder or
    /// the value has no raw representation.
    pub fn encode(&self, value: &V) -> Result<RawValue> {
        let encode = self.encode.ok_or_else(|| {
            Error::NotWritable(format!(
                "{} register at offset {} has no encoder",
                self.class, self.offset
            ))
        })?;
        encode(value).ok_or_else(|| Error::NotWritable(format!("value {:?} cannot be written", value)))
    }

    /// Write a value for the node at `base`.
    ///
    /// The value is encoded before any transport call, so a rejected value
    /// never reaches the bus.
    pub async fn write(
        &self,
        transport: &dyn RegisterTransport,
        base: RegisterAddress,
        value: &V,
    ) -> Result<()> {
        let raw = self.encode(value)?;
        let address = self.address(base);
        debug!("writing register {}[{}]={}", self.class, address, raw);
        transport.write_register(address, raw).await?;
        Ok(())
    }
}

impl<V> Clone for TypedRegister<V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V> Copy for TypedRegister<V> {}

impl<V> fmt::Debug for TypedRegister<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedRegister")
            .field("offset", &self.offset)
            .field("class", &self.class)
            .field("readable", &self.is_readable())
            .field("writable", &self.is_writable())
            .finish()
    }
}
