//! Block parameter sets carried by the block definition packets.
//!
//! The layouts mirror the `DefineBlock` and `DefineBlockExt` payloads field for
//! field, so a parameter struct can be written to the wire without any
//! translation step.

/// Block type identifier as used on the wire.
pub type BlockId = u8;

/// Air. Never holds a custom definition.
pub const BLOCK_AIR: BlockId = 0;

/// Number of addressable block ids.
pub const MAX_BLOCKS: usize = 256;

/// Number of block types every classic client knows without extensions.
pub const STANDARD_BLOCK_COUNT: BlockId = 50;

/// How entities collide with a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Solidity {
    #[default]
    Walkthrough = 0,
    Swim = 1,
    Solid = 2,
}

impl TryFrom<u8> for Solidity {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::Walkthrough,
            1 => Self::Swim,
            2 => Self::Solid,
            other => return Err(other),
        })
    }
}

/// Sound played when walking on or breaking the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum WalkSound {
    #[default]
    None = 0,
    Wood = 1,
    Gravel = 2,
    Grass = 3,
    Stone = 4,
    Metal = 5,
    Glass = 6,
    Cloth = 7,
    Sand = 8,
    Snow = 9,
}

impl TryFrom<u8> for WalkSound {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::None,
            1 => Self::Wood,
            2 => Self::Gravel,
            3 => Self::Grass,
            4 => Self::Stone,
            5 => Self::Metal,
            6 => Self::Glass,
            7 => Self::Cloth,
            8 => Self::Sand,
            9 => Self::Snow,
            other => return Err(other),
        })
    }
}

/// Render pass the block is drawn in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum DrawMode {
    #[default]
    Opaque = 0,
    Transparent = 1,
    TransparentNoCull = 2,
    Translucent = 3,
    Gas = 4,
}

impl TryFrom<u8> for DrawMode {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::Opaque,
            1 => Self::Transparent,
            2 => Self::TransparentNoCull,
            3 => Self::Translucent,
            4 => Self::Gas,
            other => return Err(other),
        })
    }
}

/// Parameters of a `DefineBlock` packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BasicParams {
    pub solidity: Solidity,
    /// Movement speed, 128 is normal walking speed.
    pub move_speed: u8,
    pub top_tex: u8,
    pub side_tex: u8,
    pub bottom_tex: u8,
    pub transmits_light: bool,
    pub walk_sound: WalkSound,
    pub full_bright: bool,
    /// Height of the block in sixteenths, 0 renders it as a sprite.
    pub shape: u8,
    pub draw_mode: DrawMode,
    pub fog_density: u8,
    pub fog_r: u8,
    pub fog_g: u8,
    pub fog_b: u8,
}

impl BasicParams {
    /// All fields zero.
    pub const ZEROED: Self = Self {
        solidity: Solidity::Walkthrough,
        move_speed: 0,
        top_tex: 0,
        side_tex: 0,
        bottom_tex: 0,
        transmits_light: false,
        walk_sound: WalkSound::None,
        full_bright: false,
        shape: 0,
        draw_mode: DrawMode::Opaque,
        fog_density: 0,
        fog_r: 0,
        fog_g: 0,
        fog_b: 0,
    };
}

/// Parameters of a `DefineBlockExt` packet: per-face textures and a bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExtendedParams {
    pub solidity: Solidity,
    pub move_speed: u8,
    pub top_tex: u8,
    pub left_tex: u8,
    pub right_tex: u8,
    pub front_tex: u8,
    pub back_tex: u8,
    pub bottom_tex: u8,
    pub transmits_light: bool,
    pub walk_sound: WalkSound,
    pub full_bright: bool,
    pub min_x: u8,
    pub min_y: u8,
    pub min_z: u8,
    pub max_x: u8,
    pub max_y: u8,
    pub max_z: u8,
    pub draw_mode: DrawMode,
    pub fog_density: u8,
    pub fog_r: u8,
    pub fog_g: u8,
    pub fog_b: u8,
}

impl ExtendedParams {
    /// All fields zero.
    pub const ZEROED: Self = Self {
        solidity: Solidity::Walkthrough,
        move_speed: 0,
        top_tex: 0,
        left_tex: 0,
        right_tex: 0,
        front_tex: 0,
        back_tex: 0,
        bottom_tex: 0,
        transmits_light: false,
        walk_sound: WalkSound::None,
        full_bright: false,
        min_x: 0,
        min_y: 0,
        min_z: 0,
        max_x: 0,
        max_y: 0,
        max_z: 0,
        draw_mode: DrawMode::Opaque,
        fog_density: 0,
        fog_r: 0,
        fog_g: 0,
        fog_b: 0,
    };
}

/// Which parameter set a definition carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    Basic,
    Extended,
}

/// The parameter set of a block definition.
///
/// Extended accessors are only reachable through the `Extended` variant, so a
/// basic definition can never be read as an extended one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockParams {
    Basic(BasicParams),
    Extended(ExtendedParams),
}

impl BlockParams {
    /// Zero-initialised parameters of the given kind.
    pub const fn zeroed(kind: ParamKind) -> Self {
        match kind {
            ParamKind::Basic => Self::Basic(BasicParams::ZEROED),
            ParamKind::Extended => Self::Extended(ExtendedParams::ZEROED),
        }
    }

    pub const fn kind(&self) -> ParamKind {
        match self {
            Self::Basic(_) => ParamKind::Basic,
            Self::Extended(_) => ParamKind::Extended,
        }
    }

    pub const fn is_extended(&self) -> bool {
        matches!(self, Self::Extended(_))
    }

    pub const fn solidity(&self) -> Solidity {
        match self {
            Self::Basic(p) => p.solidity,
            Self::Extended(p) => p.solidity,
        }
    }

    pub const fn draw_mode(&self) -> DrawMode {
        match self {
            Self::Basic(p) => p.draw_mode,
            Self::Extended(p) => p.draw_mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeroed_params_match_default() {
        assert_eq!(BasicParams::ZEROED, BasicParams::default());
        assert_eq!(ExtendedParams::ZEROED, ExtendedParams::default());
    }

    #[test]
    fn test_param_kind() {
        let basic = BlockParams::zeroed(ParamKind::Basic);
        let extended = BlockParams::zeroed(ParamKind::Extended);

        assert_eq!(basic.kind(), ParamKind::Basic);
        assert!(!basic.is_extended());
        assert!(extended.is_extended());
        assert_eq!(extended.solidity(), Solidity::Walkthrough);
    }

    #[test]
    fn test_enum_conversion_rejects_unknown_values() {
        assert_eq!(Solidity::try_from(2), Ok(Solidity::Solid));
        assert_eq!(Solidity::try_from(9), Err(9));
        assert_eq!(WalkSound::try_from(4), Ok(WalkSound::Stone));
        assert_eq!(DrawMode::try_from(5), Err(5));
    }
}
