//! Predicates over a packet and its ingress location.
//!
//! A [`Predicate`] is an immutable tree. Matching is a pure, total function of
//! `(packet, location)`; the symbolic encoding in [`crate::symbolic`] mirrors
//! [`Predicate::matches`] case for case.

use std::fmt;
use std::ops::{BitAnd, BitOr, Sub};

use crate::action::Action;
use crate::address::AddressMap;
use crate::packet::{Field, Location, Packet, PortId, SwitchId, WILDCARD};
use crate::policy::Policy;
use crate::NetcoreError;

/// A boolean test over a packet and its ingress location.
///
/// # Examples
///
/// ```
/// use netcore_slices::{Field, Location, Packet, Predicate};
///
/// let web = Predicate::inport(1, 1) & Predicate::header(Field::DstPort, 80);
/// let pkt = Packet::new([(Field::DstPort, 80)]);
///
/// assert!(web.matches(&pkt, Location::new(1, 1)));
/// assert!(!web.matches(&pkt, Location::new(1, 2)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Predicate {
    /// Matches everything.
    Top,
    /// Matches nothing.
    Bottom,
    /// Matches when the value is [`WILDCARD`] or the field equals the value.
    ///
    /// An unset field never matches a concrete value. For `switch` and `port`
    /// the value is read from the ingress location.
    Header(Field, i64),
    /// Matches the ingress location; each component wildcards independently.
    Location(Location),
    /// Either side matches.
    Union(Box<Predicate>, Box<Predicate>),
    /// Both sides match.
    Intersection(Box<Predicate>, Box<Predicate>),
    /// The left side matches and the right side does not.
    Difference(Box<Predicate>, Box<Predicate>),
}

impl Predicate {
    /// A header test.
    #[must_use]
    pub const fn header(field: Field, value: i64) -> Self {
        Self::Header(field, value)
    }

    /// A location test. Either component may be [`WILDCARD`].
    #[must_use]
    pub const fn inport(switch: SwitchId, port: PortId) -> Self {
        Self::Location(Location::new(switch, port))
    }

    /// Shorthand for a multi-field exact match.
    ///
    /// `switch` and `port` entries fold into one [`Predicate::Location`] (missing
    /// components are wildcards); every other entry becomes a
    /// [`Predicate::Header`]. The result is their intersection.
    ///
    /// ```
    /// use netcore_slices::{Field, Location, Packet, Predicate};
    ///
    /// let p = Predicate::exact(&[(Field::Switch, 2), (Field::Port, 2), (Field::Vlan, 2)]);
    /// assert!(p.matches(&Packet::new([(Field::Vlan, 2)]), Location::new(2, 2)));
    /// assert!(!p.matches(&Packet::new([(Field::Vlan, 3)]), Location::new(2, 2)));
    /// ```
    #[must_use]
    pub fn exact(fields: &[(Field, i64)]) -> Self {
        let mut location = Location::default();
        let mut has_location = false;
        let mut headers = Vec::new();
        for (field, value) in fields {
            match field {
                Field::Switch => {
                    location.switch = *value;
                    has_location = true;
                }
                Field::Port => {
                    location.port = *value;
                    has_location = true;
                }
                _ => headers.push(Self::Header(*field, *value)),
            }
        }
        if has_location {
            headers.insert(0, Self::Location(location));
        }
        nary_intersection(headers)
    }

    /// Pairs this predicate with actions, producing a primitive policy.
    #[must_use]
    pub fn then(self, actions: impl IntoIterator<Item = Action>) -> Policy {
        Policy::primitive(self, actions)
    }

    /// Tests the predicate against a packet at a location.
    #[must_use]
    pub fn matches(&self, packet: &Packet, location: Location) -> bool {
        match self {
            Self::Top => true,
            Self::Bottom => false,
            Self::Header(field, value) => {
                if *value == WILDCARD {
                    return true;
                }
                let actual = match field {
                    Field::Switch => Some(location.switch),
                    Field::Port => Some(location.port),
                    _ => packet.get(*field),
                };
                actual == Some(*value)
            }
            Self::Location(pattern) => pattern.covers(&location),
            Self::Union(p, q) => p.matches(packet, location) || q.matches(packet, location),
            Self::Intersection(p, q) => {
                p.matches(packet, location) && q.matches(packet, location)
            }
            Self::Difference(p, q) => p.matches(packet, location) && !q.matches(packet, location),
        }
    }

    /// Translates logical switch/port identifiers into physical ones.
    ///
    /// Payload headers pass through unchanged. Locations are mapped with
    /// [`AddressMap::physical_pattern`], and so are `switch`/`port` headers,
    /// which test the ingress location: a concrete `port` header is
    /// "any switch, this port" and fails with
    /// [`TranslationFailure::WildcardSwitch`](crate::TranslationFailure::WildcardSwitch).
    /// The first failure anywhere in the tree is returned.
    pub fn get_physical_predicate(&self, map: &AddressMap) -> Result<Self, NetcoreError> {
        Ok(match self {
            Self::Header(_, WILDCARD) | Self::Top | Self::Bottom => self.clone(),
            Self::Header(Field::Switch, switch) => Self::Header(
                Field::Switch,
                map.physical_pattern(Location::new(*switch, WILDCARD))?.switch,
            ),
            Self::Header(Field::Port, port) => Self::Header(
                Field::Port,
                map.physical_pattern(Location::new(WILDCARD, *port))?.port,
            ),
            Self::Header(..) => self.clone(),
            Self::Location(location) => Self::Location(map.physical_pattern(*location)?),
            Self::Union(p, q) => Self::Union(
                Box::new(p.get_physical_predicate(map)?),
                Box::new(q.get_physical_predicate(map)?),
            ),
            Self::Intersection(p, q) => Self::Intersection(
                Box::new(p.get_physical_predicate(map)?),
                Box::new(q.get_physical_predicate(map)?),
            ),
            Self::Difference(p, q) => Self::Difference(
                Box::new(p.get_physical_predicate(map)?),
                Box::new(q.get_physical_predicate(map)?),
            ),
        })
    }
}

/// Folds predicates with union. Empty input yields [`Predicate::Bottom`].
#[must_use]
pub fn nary_union(predicates: impl IntoIterator<Item = Predicate>) -> Predicate {
    predicates
        .into_iter()
        .reduce(|acc, p| acc | p)
        .unwrap_or(Predicate::Bottom)
}

/// Folds predicates with intersection. Empty input yields [`Predicate::Top`].
#[must_use]
pub fn nary_intersection(predicates: impl IntoIterator<Item = Predicate>) -> Predicate {
    predicates
        .into_iter()
        .reduce(|acc, p| acc & p)
        .unwrap_or(Predicate::Top)
}

impl BitOr for Predicate {
    type Output = Predicate;

    fn bitor(self, rhs: Self) -> Self::Output {
        Predicate::Union(Box::new(self), Box::new(rhs))
    }
}

impl BitAnd for Predicate {
    type Output = Predicate;

    fn bitand(self, rhs: Self) -> Self::Output {
        Predicate::Intersection(Box::new(self), Box::new(rhs))
    }
}

impl Sub for Predicate {
    type Output = Predicate;

    fn sub(self, rhs: Self) -> Self::Output {
        Predicate::Difference(Box::new(self), Box::new(rhs))
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Top => write!(f, "top"),
            Self::Bottom => write!(f, "bottom"),
            Self::Header(field, value) if *value == WILDCARD => write!(f, "{} = *", field),
            Self::Header(field, value) => write!(f, "{} = {}", field, value),
            Self::Location(location) => write!(f, "at {}", location),
            Self::Union(p, q) => write!(f, "({} | {})", p, q),
            Self::Intersection(p, q) => write!(f, "({} & {})", p, q),
            Self::Difference(p, q) => write!(f, "({} - {})", p, q),
        }
    }
}
