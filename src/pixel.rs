use bytemuck::Pod;
use half::f16;

/// Type tag a loader attaches to a decoded buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelKind {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    F16,
    F32,
    F64,
}

impl PixelKind {
    pub fn size_in_bytes(self) -> usize {
        match self {
            PixelKind::U8 | PixelKind::I8 => 1,
            PixelKind::U16 | PixelKind::I16 | PixelKind::F16 => 2,
            PixelKind::U32 | PixelKind::I32 | PixelKind::F32 => 4,
            PixelKind::F64 => 8,
        }
    }
}

/// Numeric types a wrapper can store.
pub trait VoxelComponent: Pod + Send + Sync + PartialOrd + 'static {
    const KIND: PixelKind;

    fn to_f64(self) -> f64;
}

macro_rules! impl_voxel_component {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl VoxelComponent for $ty {
                const KIND: PixelKind = PixelKind::$kind;

                #[inline]
                fn to_f64(self) -> f64 {
                    self as f64
                }
            }
        )*
    };
}

impl_voxel_component!(
    u8 => U8,
    i8 => I8,
    u16 => U16,
    i16 => I16,
    u32 => U32,
    i32 => I32,
    f32 => F32,
    f64 => F64,
);

impl VoxelComponent for f16 {
    const KIND: PixelKind = PixelKind::F16;

    #[inline]
    fn to_f64(self) -> f64 {
        f16::to_f64(self)
    }
}
