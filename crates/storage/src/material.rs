use latent_core::constraint::Bound;
use serde::{Deserialize, Serialize};
use uom::si::{
    available_energy::kilojoule_per_kilogram,
    f64::{
        AvailableEnergy, MassDensity, SpecificHeatCapacity, ThermalConductivity,
        ThermodynamicTemperature,
    },
    mass_density::kilogram_per_cubic_meter,
    specific_heat_capacity::joule_per_kilogram_kelvin,
    thermal_conductivity::watt_per_meter_kelvin,
    thermodynamic_temperature::degree_celsius,
};

use crate::ThermalError;

/// Physical constants of a phase-change material.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PcmMaterial {
    pub latent_heat: AvailableEnergy,
    pub phase_change_temperature: ThermodynamicTemperature,
    pub specific_heat_solid: SpecificHeatCapacity,
    pub specific_heat_liquid: SpecificHeatCapacity,
    pub density_solid: MassDensity,
    pub density_liquid: MassDensity,
    pub conductivity_solid: ThermalConductivity,
    pub conductivity_liquid: ThermalConductivity,
}

impl PcmMaterial {
    /// Sodium acetate trihydrate, the salt hydrate used in the reference store.
    #[must_use]
    pub fn sodium_acetate_trihydrate() -> Self {
        Self {
            latent_heat: AvailableEnergy::new::<kilojoule_per_kilogram>(264.4),
            phase_change_temperature: ThermodynamicTemperature::new::<degree_celsius>(58.0),
            specific_heat_solid: SpecificHeatCapacity::new::<joule_per_kilogram_kelvin>(2100.0),
            specific_heat_liquid: SpecificHeatCapacity::new::<joule_per_kilogram_kelvin>(3500.0),
            density_solid: MassDensity::new::<kilogram_per_cubic_meter>(1450.0),
            density_liquid: MassDensity::new::<kilogram_per_cubic_meter>(1280.0),
            conductivity_solid: ThermalConductivity::new::<watt_per_meter_kelvin>(0.50),
            conductivity_liquid: ThermalConductivity::new::<watt_per_meter_kelvin>(0.54),
        }
    }

    /// Checks that every property is physically meaningful.
    ///
    /// # Errors
    ///
    /// Returns [`ThermalError::Configuration`] naming the first bad property.
    pub fn validate(&self) -> Result<(), ThermalError> {
        Bound::StrictlyPositive.check(
            "latent_heat",
            self.latent_heat.get::<kilojoule_per_kilogram>(),
        )?;
        Bound::StrictlyPositive.check(
            "specific_heat_solid",
            self.specific_heat_solid.get::<joule_per_kilogram_kelvin>(),
        )?;
        Bound::StrictlyPositive.check(
            "specific_heat_liquid",
            self.specific_heat_liquid.get::<joule_per_kilogram_kelvin>(),
        )?;
        Bound::StrictlyPositive.check(
            "density_solid",
            self.density_solid.get::<kilogram_per_cubic_meter>(),
        )?;
        Bound::StrictlyPositive.check(
            "density_liquid",
            self.density_liquid.get::<kilogram_per_cubic_meter>(),
        )?;
        Bound::NonNegative.check(
            "conductivity_solid",
            self.conductivity_solid.get::<watt_per_meter_kelvin>(),
        )?;
        Bound::NonNegative.check(
            "conductivity_liquid",
            self.conductivity_liquid.get::<watt_per_meter_kelvin>(),
        )?;
        Ok(())
    }
}

impl Default for PcmMaterial {
    fn default() -> Self {
        Self::sodium_acetate_trihydrate()
    }
}
