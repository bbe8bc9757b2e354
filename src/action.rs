//! Output actions: forward to ports, rewrite fields, tap to observers.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use smallvec::SmallVec;

use crate::address::AddressMap;
use crate::error::TranslationFailure;
use crate::packet::{Field, Location, Packet, PortId, SwitchId, WILDCARD};
use crate::NetcoreError;

/// Forwards to `ports` on `switch`, overwriting the `modify` fields and
/// tapping the packet to every `observe` id.
///
/// Port order is significant: two actions that list the same ports in a
/// different order are different actions, and outputs come out in list order.
///
/// # Examples
///
/// ```
/// use netcore_slices::{Action, Field, Location, Packet};
///
/// let action = Action::new(2, [1, 3]).with_modify(Field::Vlan, 7)?;
/// let outputs = action.modify_packet(&Packet::new([(Field::SrcMac, 1)]));
///
/// assert_eq!(outputs.len(), 2);
/// assert_eq!(outputs[0].1, Location::new(2, 1));
/// assert_eq!(outputs[1].0.get(Field::Vlan), Some(7));
/// # Ok::<(), netcore_slices::NetcoreError>(())
/// ```
///
/// Deserialization applies the same checks as [`Action::with_modify`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "ActionRepr")]
pub struct Action {
    switch: SwitchId,
    ports: SmallVec<[PortId; 4]>,
    modify: BTreeMap<Field, i64>,
    observe: BTreeSet<i64>,
}

/// Unchecked wire form of [`Action`].
#[derive(serde::Deserialize)]
struct ActionRepr {
    switch: SwitchId,
    ports: SmallVec<[PortId; 4]>,
    #[serde(default)]
    modify: BTreeMap<Field, i64>,
    #[serde(default)]
    observe: BTreeSet<i64>,
}

impl TryFrom<ActionRepr> for Action {
    type Error = NetcoreError;

    fn try_from(repr: ActionRepr) -> Result<Self, Self::Error> {
        repr.modify.into_iter().try_fold(
            Self::new(repr.switch, repr.ports).with_observe(repr.observe),
            |action, (field, value)| action.with_modify(field, value),
        )
    }
}

impl Action {
    /// Forward to `ports` on `switch` with no rewrites or taps.
    #[must_use]
    pub fn new(switch: SwitchId, ports: impl IntoIterator<Item = PortId>) -> Self {
        Self {
            switch,
            ports: ports.into_iter().collect(),
            modify: BTreeMap::new(),
            observe: BTreeSet::new(),
        }
    }

    /// An action on `switch` that forwards nowhere.
    #[must_use]
    pub fn drop_on(switch: SwitchId) -> Self {
        Self::new(switch, [])
    }

    /// Adds a field rewrite. `switch` and `port` cannot be rewritten.
    pub fn with_modify(mut self, field: Field, value: i64) -> Result<Self, NetcoreError> {
        if field.is_location() {
            return Err(NetcoreError::LocationRewrite { field });
        }
        self.modify.insert(field, value);
        Ok(self)
    }

    /// Adds tap ids.
    #[must_use]
    pub fn with_observe(mut self, taps: impl IntoIterator<Item = i64>) -> Self {
        self.observe.extend(taps);
        self
    }

    /// The switch this action outputs on.
    #[inline]
    #[must_use]
    pub const fn switch(&self) -> SwitchId {
        self.switch
    }

    /// Output ports, in order.
    #[must_use]
    pub fn ports(&self) -> &[PortId] {
        &self.ports
    }

    /// Field rewrites.
    #[must_use]
    pub const fn modify(&self) -> &BTreeMap<Field, i64> {
        &self.modify
    }

    /// Tap ids.
    #[must_use]
    pub const fn observe(&self) -> &BTreeSet<i64> {
        &self.observe
    }

    /// Applies the action: one `(packet, location)` per output port, with the
    /// `modify` fields overwritten and everything else copied.
    #[must_use]
    pub fn modify_packet(&self, packet: &Packet) -> Vec<(Packet, Location)> {
        self.ports
            .iter()
            .map(|port| {
                (
                    packet.overwritten(&self.modify),
                    Location::new(self.switch, *port),
                )
            })
            .collect()
    }

    /// Translates the switch and every port into physical addressing.
    ///
    /// `modify` and `observe` are carried over untranslated.
    pub fn get_physical_rep(&self, map: &AddressMap) -> Result<Self, NetcoreError> {
        if self.switch == WILDCARD {
            if let Some(port) = self.ports.first() {
                return Err(NetcoreError::PhysicalTranslation {
                    location: Location::new(self.switch, *port),
                    reason: TranslationFailure::WildcardSwitch,
                });
            }
            return Ok(self.clone());
        }
        let switch = map.physical_switch(self.switch)?;
        let ports = self
            .ports
            .iter()
            .map(|port| {
                map.physical_location(Location::new(self.switch, *port))
                    .map(|physical| physical.port)
            })
            .collect::<Result<SmallVec<_>, _>>()?;
        Ok(Self {
            switch,
            ports,
            modify: self.modify.clone(),
            observe: self.observe.clone(),
        })
    }
}

/// Forward to a single port on `switch`.
#[must_use]
pub fn forward(switch: SwitchId, port: PortId) -> Action {
    Action::new(switch, [port])
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fwd {} -> {:?}", self.switch, self.ports.as_slice())?;
        for (field, value) in &self.modify {
            write!(f, " {}:={}", field, value)?;
        }
        if !self.observe.is_empty() {
            write!(f, " obs {:?}", self.observe)?;
        }
        Ok(())
    }
}
