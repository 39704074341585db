//! Rotation Engine
//!
//! Per-object spin angles and the combined rotation matrix applied to
//! surface normals before noise sampling. Illumination never sees it.

use std::f64::consts::TAU;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::math3d::{Mat3, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// Composition order
    pub const ALL: [Self; 3] = [Self::X, Self::Y, Self::Z];

    const fn bit(self) -> u8 {
        match self {
            Self::X => 0b001,
            Self::Y => 0b010,
            Self::Z => 0b100,
        }
    }

    const fn letter(self) -> char {
        match self {
            Self::X => 'x',
            Self::Y => 'y',
            Self::Z => 'z',
        }
    }

    fn matrix(self, angle: f64) -> Mat3 {
        match self {
            Self::X => Mat3::rotation_x(angle),
            Self::Y => Mat3::rotation_y(angle),
            Self::Z => Mat3::rotation_z(angle),
        }
    }
}

/// Subset of {x, y, z}, written as a string such as `"y"` or `"xz"`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AxisSet(u8);

impl AxisSet {
    pub const EMPTY: Self = Self(0);

    pub const fn only(axis: Axis) -> Self {
        Self(axis.bit())
    }

    pub const fn with(self, axis: Axis) -> Self {
        Self(self.0 | axis.bit())
    }

    pub const fn contains(self, axis: Axis) -> bool {
        self.0 & axis.bit() != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Active axes in composition order
    pub fn iter(self) -> impl Iterator<Item = Axis> {
        Axis::ALL.into_iter().filter(move |a| self.contains(*a))
    }
}

impl FromStr for AxisSet {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.chars()
            .filter(|c| !matches!(c, ',' | ' '))
            .try_fold(Self::EMPTY, |set, c| match c.to_ascii_lowercase() {
                'x' => Ok(set.with(Axis::X)),
                'y' => Ok(set.with(Axis::Y)),
                'z' => Ok(set.with(Axis::Z)),
                other => Err(ConfigError::UnsupportedAxis(other)),
            })
    }
}

impl TryFrom<String> for AxisSet {
    type Error = ConfigError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<AxisSet> for String {
    fn from(set: AxisSet) -> Self {
        set.to_string()
    }
}

impl fmt::Display for AxisSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for axis in self.iter() {
            write!(f, "{}", axis.letter())?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Angle increases
    #[default]
    Left,
    /// Angle decreases
    Right,
}

/// A spin around one or more axes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rotation {
    pub direction: Direction,
    /// Radians per frame; zero or negative means the spin is paused
    pub speed: f64,
    #[serde(rename = "axis")]
    pub axes: AxisSet,
    /// Radians, kept in [0, 2π)
    pub angle: f64,
}

impl Rotation {
    pub fn new(direction: Direction, speed: f64, axes: AxisSet) -> Self {
        Self {
            direction,
            speed,
            axes,
            angle: 0.0,
        }
    }

    pub fn with_angle(mut self, angle: f64) -> Self {
        self.angle = angle.rem_euclid(TAU);
        self
    }

    /// Step the angle by one frame
    pub fn advance(&mut self) {
        if self.speed > 0.0 {
            match self.direction {
                Direction::Left => self.angle += self.speed,
                Direction::Right => self.angle -= self.speed,
            }
            self.angle = self.angle.rem_euclid(TAU);
        }
    }

    /// Combined matrix for the active axes, folded x then y then z.
    /// `None` means there is nothing to rotate and callers skip the transform.
    pub fn matrix(&self) -> Option<Mat3> {
        let mut axes = self.axes.iter();
        let first = axes.next()?.matrix(self.angle);
        Some(axes.fold(first, |acc, axis| axis.matrix(self.angle).mul(&acc)))
    }

    pub fn rotate(&self, normal: Vec3) -> Vec3 {
        apply(self.matrix().as_ref(), normal)
    }
}

/// Transform `normal` by `matrix`, or pass it through when there is none
#[inline]
pub fn apply(matrix: Option<&Mat3>, normal: Vec3) -> Vec3 {
    match matrix {
        Some(m) => m.transform(normal),
        None => normal,
    }
}

impl Default for Rotation {
    fn default() -> Self {
        Self::new(Direction::Left, 0.1, AxisSet::only(Axis::Y))
    }
}
