//! Logical-to-physical address maps for a slice.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::TranslationFailure;
use crate::packet::{Location, PortId, SwitchId, WILDCARD};
use crate::telemetry::{InvariantChecker, InvariantViolation};
use crate::NetcoreError;

/// The switch and port maps that place a logical slice onto the physical network.
///
/// Both maps are validated at construction:
/// - `switch_map` is injective,
/// - `port_map` is injective,
/// - every `port_map` entry `(s, p) -> (ps, pp)` agrees with `switch_map[s] == ps`.
///
/// # Examples
///
/// ```
/// use netcore_slices::{AddressMap, Location};
///
/// let map = AddressMap::new([(1, 100)], [((1, 2), (100, 200)), ((1, 3), (100, 300))])?;
/// assert_eq!(map.physical_location(Location::new(1, 2))?, Location::new(100, 200));
/// assert_eq!(map.physical_switch(1)?, 100);
/// # Ok::<(), netcore_slices::NetcoreError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AddressMap {
    switch_map: BTreeMap<SwitchId, SwitchId>,
    port_map: BTreeMap<Location, Location>,
}

impl AddressMap {
    /// Builds and validates an address map.
    pub fn new(
        switch_map: impl IntoIterator<Item = (SwitchId, SwitchId)>,
        port_map: impl IntoIterator<Item = ((SwitchId, PortId), (SwitchId, PortId))>,
    ) -> Result<Self, NetcoreError> {
        let map = Self {
            switch_map: switch_map.into_iter().collect(),
            port_map: port_map
                .into_iter()
                .map(|(l, p)| (Location::from(l), Location::from(p)))
                .collect(),
        };
        map.check_invariants()
            .map_err(|violation| NetcoreError::InconsistentAddressMap {
                info: violation.to_string(),
            })?;
        Ok(map)
    }

    /// Maps a logical switch.
    pub fn physical_switch(&self, switch: SwitchId) -> Result<SwitchId, NetcoreError> {
        self.switch_map
            .get(&switch)
            .copied()
            .ok_or(NetcoreError::PhysicalTranslation {
                location: Location::new(switch, WILDCARD),
                reason: TranslationFailure::UnmappedSwitch,
            })
    }

    /// Maps a concrete logical `(switch, port)` pair.
    pub fn physical_location(&self, location: Location) -> Result<Location, NetcoreError> {
        self.port_map
            .get(&location)
            .copied()
            .ok_or(NetcoreError::PhysicalTranslation {
                location,
                reason: TranslationFailure::UnmappedPort,
            })
    }

    /// Maps a location pattern, honoring wildcards.
    ///
    /// - concrete switch and port: looked up in the port map,
    /// - concrete switch, wildcard port: `(switch_map[switch], *)`,
    /// - wildcard switch and port: unchanged,
    /// - wildcard switch, concrete port: [`TranslationFailure::WildcardSwitch`].
    pub fn physical_pattern(&self, location: Location) -> Result<Location, NetcoreError> {
        match (location.switch == WILDCARD, location.port == WILDCARD) {
            (true, true) => Ok(location),
            (true, false) => Err(NetcoreError::PhysicalTranslation {
                location,
                reason: TranslationFailure::WildcardSwitch,
            }),
            (false, true) => Ok(Location::new(
                self.physical_switch(location.switch)?,
                WILDCARD,
            )),
            (false, false) => self.physical_location(location),
        }
    }

    /// The switch map.
    #[must_use]
    pub const fn switch_map(&self) -> &BTreeMap<SwitchId, SwitchId> {
        &self.switch_map
    }

    /// The port map.
    #[must_use]
    pub const fn port_map(&self) -> &BTreeMap<Location, Location> {
        &self.port_map
    }
}

impl InvariantChecker for AddressMap {
    fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let mut seen = BTreeSet::new();
        for (logical, physical) in &self.switch_map {
            if !seen.insert(*physical) {
                return Err(
                    InvariantViolation::new("AddressMap", "switch map is not injective")
                        .with_details(format!("switch {} maps to taken {}", logical, physical)),
                );
            }
        }

        let mut seen = BTreeSet::new();
        for (logical, physical) in &self.port_map {
            if !seen.insert(*physical) {
                return Err(
                    InvariantViolation::new("AddressMap", "port map is not injective")
                        .with_details(format!("{} maps to taken {}", logical, physical)),
                );
            }
            match self.switch_map.get(&logical.switch) {
                Some(switch) if *switch == physical.switch => {}
                Some(switch) => {
                    return Err(InvariantViolation::new(
                        "AddressMap",
                        "port map disagrees with switch map",
                    )
                    .with_details(format!(
                        "{} maps to {} but switch {} maps to {}",
                        logical, physical, logical.switch, switch
                    )));
                }
                None => {
                    return Err(InvariantViolation::new(
                        "AddressMap",
                        "port map names an unmapped switch",
                    )
                    .with_details(format!("{}", logical)));
                }
            }
        }
        Ok(())
    }
}
