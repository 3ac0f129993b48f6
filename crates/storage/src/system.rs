use latent_core::{Fraction, StepIntegrable, constraint::Bound};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uom::si::{
    area::square_meter,
    energy::joule,
    f64::{
        Area, Energy, Mass, Power, ThermalConductance, ThermodynamicTemperature, Time, Volume,
    },
    mass::kilogram,
    mass_density::kilogram_per_cubic_meter,
    power::{kilowatt, watt},
    thermal_conductance::watt_per_kelvin,
    thermodynamic_temperature::{degree_celsius, kelvin},
    time::second,
    volume::cubic_meter,
};

use crate::{
    PcmMaterial, ThermalError,
    phase::{HeatBalance, PcmBody, PhaseState},
};

/// Heat exchanger plate stack that the PCM pouches sit between.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlateGeometry {
    pub count: u32,
    /// Total wetted area across all plates.
    pub heat_transfer_area: Area,
}

impl PlateGeometry {
    #[must_use]
    pub fn area_per_plate(&self) -> Area {
        self.heat_transfer_area / f64::from(self.count.max(1))
    }
}

impl Default for PlateGeometry {
    fn default() -> Self {
        Self {
            count: 52,
            heat_transfer_area: Area::new::<square_meter>(26.1),
        }
    }
}

/// Static description of a thermal store.
///
/// This is plain data; [`ThermalSystem::new`] validates it.
/// The default is the reference unit: 227.1 kg of sodium
/// acetate trihydrate behind 26.1 m² of aluminum plates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThermalSystemConfig {
    pub material: PcmMaterial,
    pub mass: Mass,
    pub plates: PlateGeometry,
    /// Overall conductance between the circulating fluid and the PCM.
    pub heat_exchanger_ua: ThermalConductance,
    /// Conductance from the PCM to ambient through the insulation.
    pub loss_coefficient: ThermalConductance,
    /// Charging completes once the store is fully liquid at this temperature.
    pub charge_target: ThermodynamicTemperature,
    /// Lowest useful delivery temperature; bounds the usable capacity.
    pub discharge_target: ThermodynamicTemperature,
    /// Coldest ambient the unit is rated for.
    pub ambient_minimum: ThermodynamicTemperature,
    /// Solid temperature at which stored energy is zero.
    pub reference_temperature: ThermodynamicTemperature,
    /// Rate at which a crystallization front releases latent heat.
    pub crystallization_rate: Power,
}

impl Default for ThermalSystemConfig {
    fn default() -> Self {
        Self {
            material: PcmMaterial::default(),
            mass: Mass::new::<kilogram>(227.1),
            plates: PlateGeometry::default(),
            heat_exchanger_ua: ThermalConductance::new::<watt_per_kelvin>(111.7),
            loss_coefficient: ThermalConductance::new::<watt_per_kelvin>(1.5),
            charge_target: ThermodynamicTemperature::new::<degree_celsius>(65.0),
            discharge_target: ThermodynamicTemperature::new::<degree_celsius>(40.0),
            ambient_minimum: ThermodynamicTemperature::new::<degree_celsius>(-25.0),
            reference_temperature: ThermodynamicTemperature::new::<degree_celsius>(20.0),
            crystallization_rate: Power::new::<kilowatt>(2.0),
        }
    }
}

/// A validated thermal store.
///
/// Owns the phase-change state model: advancing a [`PhaseState`] by an
/// external heat flow, and triggering nucleation in a supercooled store.
#[derive(Debug, Clone, PartialEq)]
pub struct ThermalSystem {
    config: ThermalSystemConfig,
    body: PcmBody,
}

impl ThermalSystem {
    /// Validates a configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ThermalError::Configuration`] if any parameter is out of
    /// range, including a transition temperature that does not sit strictly
    /// between the ambient minimum and the charge target.
    pub fn new(config: ThermalSystemConfig) -> Result<Self, ThermalError> {
        config.material.validate()?;

        let melt_c = config
            .material
            .phase_change_temperature
            .get::<degree_celsius>();

        Bound::StrictlyPositive.check("mass", config.mass.get::<kilogram>())?;
        Bound::StrictlyPositive.check("plates.count", f64::from(config.plates.count))?;
        Bound::StrictlyPositive.check(
            "plates.heat_transfer_area",
            config.plates.heat_transfer_area.get::<square_meter>(),
        )?;
        Bound::NonNegative.check(
            "heat_exchanger_ua",
            config.heat_exchanger_ua.get::<watt_per_kelvin>(),
        )?;
        Bound::NonNegative.check(
            "loss_coefficient",
            config.loss_coefficient.get::<watt_per_kelvin>(),
        )?;
        Bound::StrictlyPositive.check(
            "crystallization_rate",
            config.crystallization_rate.get::<watt>(),
        )?;
        Bound::Below(melt_c).check(
            "ambient_minimum",
            config.ambient_minimum.get::<degree_celsius>(),
        )?;
        Bound::Above(melt_c).check("charge_target", config.charge_target.get::<degree_celsius>())?;
        Bound::Below(melt_c).check(
            "discharge_target",
            config.discharge_target.get::<degree_celsius>(),
        )?;
        Bound::AtMost(melt_c).check(
            "reference_temperature",
            config.reference_temperature.get::<degree_celsius>(),
        )?;

        let body = PcmBody::new(config.mass, &config.material, config.crystallization_rate);
        Ok(Self { config, body })
    }

    #[must_use]
    pub fn config(&self) -> &ThermalSystemConfig {
        &self.config
    }

    /// The PCM body a [`HeatBalance`] acts on.
    ///
    /// Stepping a state directly with a balance skips the stability check
    /// that [`ThermalSystem::advance`] performs.
    #[must_use]
    pub fn body(&self) -> PcmBody {
        self.body
    }

    fn reference_k(&self) -> f64 {
        self.config.reference_temperature.get::<kelvin>()
    }

    /// Largest time step the explicit update tolerates.
    ///
    /// A step is stable while `dt × (UA + loss) / (mass × cp_min) < 1`.
    /// Returns infinity for a store with no conductance at all.
    #[must_use]
    pub fn max_stable_step(&self) -> Time {
        let conductance = self.config.heat_exchanger_ua.get::<watt_per_kelvin>()
            + self.config.loss_coefficient.get::<watt_per_kelvin>();
        if conductance > 0.0 {
            Time::new::<second>(self.body.min_capacity() / conductance)
        } else {
            Time::new::<second>(f64::INFINITY)
        }
    }

    /// Checks a time step against the stability bound.
    ///
    /// # Errors
    ///
    /// Returns [`ThermalError::Stability`] naming the step and the bound, or
    /// [`ThermalError::Configuration`] for a non-positive step.
    pub fn check_step(&self, dt: Time) -> Result<(), ThermalError> {
        let dt_s = Bound::StrictlyPositive.check("dt", dt.get::<second>())?;
        let max_dt_s = self.max_stable_step().get::<second>();
        if dt_s < max_dt_s {
            Ok(())
        } else {
            Err(ThermalError::Stability { dt_s, max_dt_s })
        }
    }

    /// A fully solid store.
    ///
    /// # Errors
    ///
    /// Returns [`ThermalError::Configuration`] if `temperature` is above the
    /// transition temperature.
    pub fn solid_state(&self, temperature: ThermodynamicTemperature) -> Result<PhaseState, ThermalError> {
        Bound::AtMost(self.melt().get::<degree_celsius>())
            .check("temperature", temperature.get::<degree_celsius>())?;
        Ok(self.equilibrium(temperature.get::<kelvin>(), Fraction::ZERO))
    }

    /// A fully liquid store.
    ///
    /// Liquid below the transition temperature is supercooled.
    #[must_use]
    pub fn liquid_state(&self, temperature: ThermodynamicTemperature) -> PhaseState {
        self.equilibrium(temperature.get::<kelvin>(), Fraction::ONE)
    }

    /// A store part way through its transition, pinned at the transition
    /// temperature.
    #[must_use]
    pub fn melting_state(&self, liquid_fraction: Fraction) -> PhaseState {
        self.equilibrium(self.body.melt_k(), liquid_fraction)
    }

    fn equilibrium(&self, temperature_k: f64, fraction: Fraction) -> PhaseState {
        let energy = self
            .body
            .enthalpy(temperature_k, fraction.get(), self.reference_k());
        let supercooled = fraction == Fraction::ONE && temperature_k < self.body.melt_k();
        PhaseState::from_parts(temperature_k, fraction, energy, supercooled, false)
    }

    #[must_use]
    pub fn melt(&self) -> ThermodynamicTemperature {
        self.config.material.phase_change_temperature
    }

    /// Energy between solid at the discharge target and liquid at the charge
    /// target.
    #[must_use]
    pub fn usable_capacity(&self) -> Energy {
        let full = self.body.enthalpy(
            self.config.charge_target.get::<kelvin>(),
            1.0,
            self.reference_k(),
        );
        let empty = self.body.enthalpy(
            self.config.discharge_target.get::<kelvin>(),
            0.0,
            self.reference_k(),
        );
        Energy::new::<joule>(full - empty)
    }

    /// Share of the usable capacity currently held, clamped to `[0, 1]`.
    #[must_use]
    pub fn state_of_charge(&self, state: &PhaseState) -> Fraction {
        let empty = self.body.enthalpy(
            self.config.discharge_target.get::<kelvin>(),
            0.0,
            self.reference_k(),
        );
        let capacity = self.usable_capacity().get::<joule>();
        Fraction::saturating((state.energy_j() - empty) / capacity)
    }

    /// Volume the PCM occupies, accounting for expansion on melting.
    #[must_use]
    pub fn pcm_volume(&self, state: &PhaseState) -> Volume {
        let mass = self.config.mass.get::<kilogram>();
        let liquid = state.liquid_fraction();
        let rho_s = self.config.material.density_solid.get::<kilogram_per_cubic_meter>();
        let rho_l = self
            .config
            .material
            .density_liquid
            .get::<kilogram_per_cubic_meter>();
        Volume::new::<cubic_meter>(mass * (liquid * (1.0 / rho_l) + liquid.complement() * (1.0 / rho_s)))
    }

    /// Heat flowing from the store to ambient through the insulation.
    #[must_use]
    pub fn ambient_loss(&self, state: &PhaseState, ambient: ThermodynamicTemperature) -> Power {
        let ua = self.config.loss_coefficient.get::<watt_per_kelvin>();
        Power::new::<watt>(ua * (state.temperature_k() - ambient.get::<kelvin>()))
    }

    /// Advances a state by one step under an external heat flow.
    ///
    /// `heat_flow` is positive into the store. Ambient loss is subtracted
    /// before the energy is applied.
    ///
    /// # Errors
    ///
    /// Returns [`ThermalError::Stability`] if `dt` violates the stability
    /// bound.
    pub fn advance(
        &self,
        state: &PhaseState,
        heat_flow: Power,
        dt: Time,
        ambient: ThermodynamicTemperature,
    ) -> Result<PhaseState, ThermalError> {
        self.check_step(dt)?;
        let balance = HeatBalance {
            net_power: heat_flow - self.ambient_loss(state, ambient),
            body: self.body,
        };
        Ok(state.step(balance, dt))
    }

    /// Starts a crystallization front in a supercooled store.
    ///
    /// # Errors
    ///
    /// Returns [`ThermalError::NotSupercooled`] if the store is not
    /// supercooled; the caller's state is left as it was.
    pub fn trigger_nucleation(&self, state: &PhaseState) -> Result<PhaseState, ThermalError> {
        if !state.is_supercooled() {
            return Err(ThermalError::NotSupercooled {
                temperature_c: state.temperature().get::<degree_celsius>(),
                liquid_fraction: state.liquid_fraction().get(),
            });
        }
        debug!(
            temperature_c = state.temperature().get::<degree_celsius>(),
            "nucleation triggered"
        );
        Ok(state.nucleated())
    }
}
