//! The four evolved fields and their boundary conditions.

use crate::Real;

/// One of the four evolved plasma fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// Ion temperature Tᵢ, in eV.
    IonTemperature,
    /// Electron temperature Tₑ, in eV.
    ElectronTemperature,
    /// Electron density nₑ, in m⁻³.
    Density,
    /// Poloidal flux ψ, in Wb.
    PoloidalFlux,
}

impl Field {
    /// All fields, in the fixed state-layout order (Tᵢ, Tₑ, nₑ, ψ).
    pub const ALL: [Self; 4] = [
        Self::IonTemperature,
        Self::ElectronTemperature,
        Self::Density,
        Self::PoloidalFlux,
    ];

    /// Position of this field within the state layout.
    pub fn index(self) -> usize {
        match self {
            Self::IonTemperature => 0,
            Self::ElectronTemperature => 1,
            Self::Density => 2,
            Self::PoloidalFlux => 3,
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IonTemperature => write!(f, "T_i"),
            Self::ElectronTemperature => write!(f, "T_e"),
            Self::Density => write!(f, "n_e"),
            Self::PoloidalFlux => write!(f, "psi"),
        }
    }
}

/// Which of the four equations are evolved by the solver.
///
/// A frozen field keeps its old-time value; the solver replaces its equation
/// with an identity row so the state layout never changes shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvolveFlags {
    /// Evolve the ion heat equation.
    pub ion_temperature: bool,
    /// Evolve the electron heat equation.
    pub electron_temperature: bool,
    /// Evolve the particle transport equation.
    pub density: bool,
    /// Evolve the current diffusion equation.
    pub poloidal_flux: bool,
}

impl EvolveFlags {
    /// Evolve everything.
    pub fn all() -> Self {
        Self {
            ion_temperature: true,
            electron_temperature: true,
            density: true,
            poloidal_flux: true,
        }
    }

    /// Whether `field`'s equation is evolved.
    pub fn evolves(&self, field: Field) -> bool {
        match field {
            Field::IonTemperature => self.ion_temperature,
            Field::ElectronTemperature => self.electron_temperature,
            Field::Density => self.density,
            Field::PoloidalFlux => self.poloidal_flux,
        }
    }
}

impl Default for EvolveFlags {
    fn default() -> Self {
        Self::all()
    }
}

/// Boundary condition at one side of the radial domain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoundaryCondition {
    /// Dirichlet: the field takes this value at the boundary face.
    Value(Real),
    /// Neumann: the field has this radial gradient at the boundary face.
    Gradient(Real),
}

/// Boundary conditions of one field, at the magnetic axis and the edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundarySet {
    /// Condition at the innermost face (ρ = 0 side).
    pub axis: BoundaryCondition,
    /// Condition at the outermost face (ρ = a side).
    pub edge: BoundaryCondition,
}

impl Default for BoundarySet {
    /// Reflecting on both sides.
    fn default() -> Self {
        Self {
            axis: BoundaryCondition::Gradient(0.0),
            edge: BoundaryCondition::Gradient(0.0),
        }
    }
}

/// Boundary conditions for all four fields.
///
/// These belong to the dynamic runtime parameters and do not change within
/// a timestep.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StateBoundaries {
    /// Tᵢ boundary conditions.
    pub ion_temperature: BoundarySet,
    /// Tₑ boundary conditions.
    pub electron_temperature: BoundarySet,
    /// nₑ boundary conditions.
    pub density: BoundarySet,
    /// ψ boundary conditions.
    pub poloidal_flux: BoundarySet,
}

impl StateBoundaries {
    /// Returns the boundary set of `field`.
    pub fn for_field(&self, field: Field) -> &BoundarySet {
        match field {
            Field::IonTemperature => &self.ion_temperature,
            Field::ElectronTemperature => &self.electron_temperature,
            Field::Density => &self.density,
            Field::PoloidalFlux => &self.poloidal_flux,
        }
    }
}
