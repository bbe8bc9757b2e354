//! Packets, header fields and locations.
//!
//! A [`Packet`] is an immutable map from [`Field`] to integer value. Unset
//! fields are absent rather than zero. The ingress [`Location`] travels
//! alongside a packet instead of inside it.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::NetcoreError;

/// Identifier of a switch (or host) in a topology. `0` is the wildcard.
pub type SwitchId = i64;

/// Switch-local port number. `0` is the wildcard.
pub type PortId = i64;

/// The wildcard sentinel for header values and location components.
pub const WILDCARD: i64 = 0;

/// A header field. The set is closed: every field a predicate, action or
/// symbolic packet can mention is listed here.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    /// Location: the switch a packet is at.
    Switch,
    /// Location: the port a packet is at.
    Port,
    /// Link-layer source address.
    SrcMac,
    /// Link-layer destination address.
    DstMac,
    /// Link-layer ethertype.
    EthType,
    /// Network-layer source address.
    SrcIp,
    /// Network-layer destination address.
    DstIp,
    /// VLAN tag. Reserved for slice bookkeeping by the compiler.
    Vlan,
    /// Network-layer protocol number.
    Protocol,
    /// Transport source port.
    SrcPort,
    /// Transport destination port.
    DstPort,
}

impl Field {
    /// Every header field, location fields first.
    pub const ALL: [Field; 11] = [
        Field::Switch,
        Field::Port,
        Field::SrcMac,
        Field::DstMac,
        Field::EthType,
        Field::SrcIp,
        Field::DstIp,
        Field::Vlan,
        Field::Protocol,
        Field::SrcPort,
        Field::DstPort,
    ];

    /// The header name, as used in diagnostics and in [`FromStr`].
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Switch => "switch",
            Self::Port => "port",
            Self::SrcMac => "srcmac",
            Self::DstMac => "dstmac",
            Self::EthType => "ethtype",
            Self::SrcIp => "srcip",
            Self::DstIp => "dstip",
            Self::Vlan => "vlan",
            Self::Protocol => "protocol",
            Self::SrcPort => "srcport",
            Self::DstPort => "dstport",
        }
    }

    /// Returns `true` for `switch` and `port`.
    #[must_use]
    pub const fn is_location(&self) -> bool {
        matches!(self, Self::Switch | Self::Port)
    }

    /// Every field except `switch` and `port`.
    pub fn payload() -> impl Iterator<Item = Field> {
        Self::ALL.into_iter().filter(|f| !f.is_location())
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = NetcoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| NetcoreError::UnknownField { name: s.to_owned() })
    }
}

/// A `(switch, port)` pair. Either component may be [`WILDCARD`] when used as
/// a pattern.
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct Location {
    /// Switch component.
    pub switch: SwitchId,
    /// Port component.
    pub port: PortId,
}

impl Location {
    /// Creates a location.
    #[inline]
    #[must_use]
    pub const fn new(switch: SwitchId, port: PortId) -> Self {
        Self { switch, port }
    }

    /// Returns `true` if this location, read as a pattern, covers `other`.
    #[inline]
    #[must_use]
    pub const fn covers(&self, other: &Location) -> bool {
        (self.switch == WILDCARD || self.switch == other.switch)
            && (self.port == WILDCARD || self.port == other.port)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |v: i64| {
            if v == WILDCARD {
                "*".to_owned()
            } else {
                v.to_string()
            }
        };
        write!(f, "({}, {})", show(self.switch), show(self.port))
    }
}

impl From<(SwitchId, PortId)> for Location {
    fn from((switch, port): (SwitchId, PortId)) -> Self {
        Self::new(switch, port)
    }
}

/// An immutable packet: a map from header field to value.
///
/// Operations that "modify" a packet return a new one. Only payload fields
/// (see [`Field::payload`]) are stored: a packet's switch and port are the
/// location it is processed at, so `switch`/`port` entries passed to the
/// typed constructors are dropped, and [`Packet::from_named`] and
/// deserialization reject them.
///
/// # Examples
///
/// ```
/// use netcore_slices::{Field, Packet};
///
/// let pkt = Packet::new([(Field::SrcMac, 1), (Field::Vlan, 6)]);
/// assert_eq!(pkt.get(Field::SrcMac), Some(1));
/// assert_eq!(pkt.get(Field::DstIp), None);
///
/// let tagged = pkt.with(Field::Vlan, 2);
/// assert_eq!(tagged.get(Field::Vlan), Some(2));
/// assert_eq!(pkt.get(Field::Vlan), Some(6));
/// ```
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize,
)]
#[serde(try_from = "PacketRepr")]
pub struct Packet {
    fields: BTreeMap<Field, i64>,
}

/// Unchecked wire form of [`Packet`].
#[derive(serde::Deserialize)]
struct PacketRepr {
    fields: BTreeMap<Field, i64>,
}

impl TryFrom<PacketRepr> for Packet {
    type Error = NetcoreError;

    fn try_from(repr: PacketRepr) -> Result<Self, Self::Error> {
        let fields = repr
            .fields
            .into_iter()
            .map(|(field, value)| checked_header(field).map(|field| (field, value)))
            .collect::<Result<_, _>>()?;
        Ok(Self { fields })
    }
}

fn checked_header(field: Field) -> Result<Field, NetcoreError> {
    if field.is_location() {
        return Err(NetcoreError::LocationHeader { field });
    }
    Ok(field)
}

impl Packet {
    /// Creates a packet from `(field, value)` pairs. Later pairs win.
    ///
    /// `switch` and `port` pairs are ignored.
    #[must_use]
    pub fn new(fields: impl IntoIterator<Item = (Field, i64)>) -> Self {
        Self {
            fields: fields
                .into_iter()
                .filter(|(field, _)| !field.is_location())
                .collect(),
        }
    }

    /// Creates a packet from header names.
    ///
    /// # Errors
    ///
    /// Returns [`NetcoreError::UnknownField`] for a name outside the header
    /// set and [`NetcoreError::LocationHeader`] for `switch` or `port`.
    pub fn from_named<'a>(
        fields: impl IntoIterator<Item = (&'a str, i64)>,
    ) -> Result<Self, NetcoreError> {
        let fields = fields
            .into_iter()
            .map(|(name, value)| Ok((checked_header(name.parse::<Field>()?)?, value)))
            .collect::<Result<BTreeMap<_, _>, NetcoreError>>()?;
        Ok(Self { fields })
    }

    /// Returns the value of `field`, or `None` if the field is unset.
    #[inline]
    #[must_use]
    pub fn get(&self, field: Field) -> Option<i64> {
        self.fields.get(&field).copied()
    }

    /// Returns a copy of this packet with `field` set to `value`.
    ///
    /// Setting `switch` or `port` returns an unchanged copy.
    #[must_use]
    pub fn with(&self, field: Field, value: i64) -> Self {
        self.overwritten([(&field, &value)])
    }

    /// Returns a copy of this packet with every `(field, value)` in `overrides`
    /// applied. `switch` and `port` overrides are ignored.
    #[must_use]
    pub fn overwritten<'a>(&self, overrides: impl IntoIterator<Item = (&'a Field, &'a i64)>) -> Self {
        let mut fields = self.fields.clone();
        fields.extend(
            overrides
                .into_iter()
                .filter(|(f, _)| !f.is_location())
                .map(|(f, v)| (*f, *v)),
        );
        Self { fields }
    }

    /// Iterates over the set fields in header order.
    pub fn iter(&self) -> impl Iterator<Item = (Field, i64)> + '_ {
        self.fields.iter().map(|(f, v)| (*f, *v))
    }

    /// The set fields as a map.
    #[must_use]
    pub const fn fields(&self) -> &BTreeMap<Field, i64> {
        &self.fields
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (field, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", field, value)?;
        }
        write!(f, "}}")
    }
}
