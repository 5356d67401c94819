//! Conversion dispatch.
//!
//! A [`ConverterKey`] names one cell of the conversion table: the semantic
//! role of the data, its component type and shape, whether it is normalized
//! or interleaved, and the requested triangle winding. [`select`] maps a key
//! to a [`Converter`] holding a monomorphized routine for exactly that cell,
//! or fails with `UnsupportedFormat`. There is no generic fallback.
//!
//! | Semantic      | Shapes         | Component types                      | Output    |
//! |---------------|----------------|--------------------------------------|-----------|
//! | Position      | VEC3           | f32, i8/u8/i16/u16                   | f32 x 3   |
//! | Normal        | VEC3           | f32, normalized i8/i16               | f32 x 3   |
//! | Tangent       | VEC4           | f32, normalized i8/i16               | f32 x 4   |
//! | TexCoord      | VEC2           | f32, i8/u8/i16/u16                   | f32 x 2   |
//! | Color         | VEC3, VEC4     | f32, u8/u16 (always normalized)      | f32 x 4   |
//! | Generic       | any            | any, except padded matrix columns    | f32 x n   |
//! | JointIndex    | VEC4           | u8/u16 (never normalized)            | u16 x 4   |
//! | JointWeight   | VEC4           | f32, normalized u8/u16               | f32 x 4   |
//! | TriangleIndex | SCALAR         | u8/u16/u32                           | i32       |
//! | SparseIndex   | SCALAR         | u8/u16/u32                           | u32       |
//! | Rotation      | VEC4           | f32, normalized i8/u8/i16/u16        | f32 x 4   |
//! | Matrix        | MAT2/3/4       | f32                                  | f32 x n   |

use std::fmt;

use num_traits::ToPrimitive;

use crate::accessor::ResolvedWindow;
use crate::component_type::{AttributeShape, Component, ComponentType};
use crate::error::{DecodeError, DecodeResult};

/// Role of the data being converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Semantic {
    Position,
    Normal,
    Tangent,
    TexCoord,
    Color,
    Generic,
    JointIndex,
    JointWeight,
    TriangleIndex,
    SparseIndex,
    Rotation,
    Matrix,
}

impl Semantic {
    pub fn name(self) -> &'static str {
        match self {
            Semantic::Position => "position",
            Semantic::Normal => "normal",
            Semantic::Tangent => "tangent",
            Semantic::TexCoord => "texcoord",
            Semantic::Color => "color",
            Semantic::Generic => "generic",
            Semantic::JointIndex => "joint index",
            Semantic::JointWeight => "joint weight",
            Semantic::TriangleIndex => "triangle index",
            Semantic::SparseIndex => "sparse index",
            Semantic::Rotation => "rotation",
            Semantic::Matrix => "matrix",
        }
    }
}

impl fmt::Display for Semantic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Triangle winding requested for index buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Winding {
    #[default]
    Preserve,
    /// Reverse every index triple: `[a, b, c]` becomes `[c, b, a]`.
    Flip,
}

/// One cell of the conversion table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConverterKey {
    pub semantic: Semantic,
    pub component_type: ComponentType,
    pub shape: AttributeShape,
    pub normalized: bool,
    pub interleaved: bool,
    pub winding: Winding,
}

impl ConverterKey {
    /// Key describing `window` in the given role.
    pub fn for_window(semantic: Semantic, window: &ResolvedWindow<'_>, winding: Winding) -> Self {
        Self {
            semantic,
            component_type: window.component_type,
            shape: window.shape,
            normalized: window.normalized,
            interleaved: window.is_interleaved(),
            winding,
        }
    }
}

impl fmt::Display for ConverterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}{}{}",
            self.semantic,
            self.shape,
            self.component_type,
            if self.normalized { " normalized" } else { "" },
            if self.interleaved { " interleaved" } else { "" },
        )
    }
}

/// Element type and width a converter writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    F32(usize),
    U16(usize),
    U32,
    I32,
}

impl OutputKind {
    pub fn components(self) -> usize {
        match self {
            OutputKind::F32(n) | OutputKind::U16(n) => n,
            OutputKind::U32 | OutputKind::I32 => 1,
        }
    }
}

// ============================================================================
// Destinations
// ============================================================================

/// Caller-owned storage a converter writes into.
#[derive(Debug)]
pub enum Destination<'d> {
    F32 { data: &'d mut [f32], components: usize },
    U16 { data: &'d mut [u16], components: usize },
    U32(&'d mut [u32]),
    I32(&'d mut [i32]),
}

impl Destination<'_> {
    pub fn kind(&self) -> OutputKind {
        match self {
            Destination::F32 { components, .. } => OutputKind::F32(*components),
            Destination::U16 { components, .. } => OutputKind::U16(*components),
            Destination::U32(_) => OutputKind::U32,
            Destination::I32(_) => OutputKind::I32,
        }
    }

    /// Number of scalar slots.
    pub fn len(&self) -> usize {
        match self {
            Destination::F32 { data, .. } => data.len(),
            Destination::U16 { data, .. } => data.len(),
            Destination::U32(data) => data.len(),
            Destination::I32(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of whole elements.
    pub fn element_count(&self) -> usize {
        self.len() / self.kind().components().max(1)
    }

    /// Reborrows the destination for a shorter lifetime.
    pub fn reborrow(&mut self) -> Destination<'_> {
        match self {
            Destination::F32 { data, components } => Destination::F32 {
                data: &mut **data,
                components: *components,
            },
            Destination::U16 { data, components } => Destination::U16 {
                data: &mut **data,
                components: *components,
            },
            Destination::U32(data) => Destination::U32(&mut **data),
            Destination::I32(data) => Destination::I32(&mut **data),
        }
    }
}

/// A vector of `len` copies of `value`, failing instead of aborting when the
/// allocation is too large.
pub fn try_filled<T: Clone>(value: T, len: usize) -> DecodeResult<Vec<T>> {
    let mut out = Vec::new();
    out.try_reserve_exact(len)
        .map_err(|e| DecodeError::bounds(format!("Cannot allocate {} elements: {}", len, e)))?;
    out.resize(len, value);
    Ok(out)
}

/// Owned output of a conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedArray {
    F32 { data: Vec<f32>, components: usize },
    U16 { data: Vec<u16>, components: usize },
    U32(Vec<u32>),
    I32(Vec<i32>),
}

impl TypedArray {
    /// Zeroed storage for `count` elements of `kind`.
    ///
    /// # Errors
    ///
    /// Returns `DecodeError::Bounds` if the storage size overflows or cannot
    /// be allocated.
    pub fn allocate(kind: OutputKind, count: usize) -> DecodeResult<Self> {
        let len = count
            .checked_mul(kind.components())
            .ok_or_else(|| DecodeError::bounds(format!("Output of {} elements overflows", count)))?;
        Ok(match kind {
            OutputKind::F32(components) => TypedArray::F32 {
                data: try_filled(0.0, len)?,
                components,
            },
            OutputKind::U16(components) => TypedArray::U16 {
                data: try_filled(0, len)?,
                components,
            },
            OutputKind::U32 => TypedArray::U32(try_filled(0, len)?),
            OutputKind::I32 => TypedArray::I32(try_filled(0, len)?),
        })
    }

    pub fn kind(&self) -> OutputKind {
        match self {
            TypedArray::F32 { components, .. } => OutputKind::F32(*components),
            TypedArray::U16 { components, .. } => OutputKind::U16(*components),
            TypedArray::U32(_) => OutputKind::U32,
            TypedArray::I32(_) => OutputKind::I32,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            TypedArray::F32 { data, .. } => data.len(),
            TypedArray::U16 { data, .. } => data.len(),
            TypedArray::U32(data) => data.len(),
            TypedArray::I32(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_destination(&mut self) -> Destination<'_> {
        match self {
            TypedArray::F32 { data, components } => Destination::F32 {
                data: data.as_mut_slice(),
                components: *components,
            },
            TypedArray::U16 { data, components } => Destination::U16 {
                data: data.as_mut_slice(),
                components: *components,
            },
            TypedArray::U32(data) => Destination::U32(data.as_mut_slice()),
            TypedArray::I32(data) => Destination::I32(data.as_mut_slice()),
        }
    }

    pub fn as_f32(&self) -> Option<&[f32]> {
        match self {
            TypedArray::F32 { data, .. } => Some(data),
            _ => None,
        }
    }

    pub fn as_u16(&self) -> Option<&[u16]> {
        match self {
            TypedArray::U16 { data, .. } => Some(data),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<&[u32]> {
        match self {
            TypedArray::U32(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<&[i32]> {
        match self {
            TypedArray::I32(data) => Some(data),
            _ => None,
        }
    }
}

// ============================================================================
// Source layouts
// ============================================================================

const MAX_ELEMENT_SIZE: usize = 64; // MAT4 of f32
static ZERO_ELEMENT: [u8; MAX_ELEMENT_SIZE] = [0; MAX_ELEMENT_SIZE];

/// How elements are laid out in a source window.
pub trait Layout: 'static {
    /// Calls `f(i, element_bytes)` for every element of `window`, in order.
    /// Zero-filled windows yield a zero element.
    fn visit<'w, F: FnMut(usize, &'w [u8])>(window: &ResolvedWindow<'w>, f: F);
}

/// Elements are contiguous.
pub struct Packed;

/// Elements are `stride` bytes apart.
pub struct Interleaved;

fn visit_zeroed<'w, F: FnMut(usize, &'w [u8])>(window: &ResolvedWindow<'w>, mut f: F) {
    let zero: &'static [u8] = &ZERO_ELEMENT[..window.element_size.min(MAX_ELEMENT_SIZE)];
    for i in 0..window.count {
        f(i, zero);
    }
}

impl Layout for Packed {
    #[inline]
    fn visit<'w, F: FnMut(usize, &'w [u8])>(window: &ResolvedWindow<'w>, mut f: F) {
        match window.bytes {
            Some(bytes) => {
                for (i, element) in bytes
                    .chunks_exact(window.element_size)
                    .take(window.count)
                    .enumerate()
                {
                    f(i, element);
                }
            }
            None => visit_zeroed(window, f),
        }
    }
}

impl Layout for Interleaved {
    #[inline]
    fn visit<'w, F: FnMut(usize, &'w [u8])>(window: &ResolvedWindow<'w>, mut f: F) {
        match window.bytes {
            Some(bytes) => {
                for i in 0..window.count {
                    let start = i * window.stride;
                    f(i, &bytes[start..start + window.element_size]);
                }
            }
            None => visit_zeroed(window, f),
        }
    }
}

// ============================================================================
// Per-element post-processing
// ============================================================================

/// Post-processing applied to each converted float element.
pub trait Finish: 'static {
    /// Output width for a source element of `src` components.
    #[inline]
    fn width(src: usize) -> usize {
        src
    }

    fn apply(element: &mut [f32], src: usize);
}

pub struct Plain;
/// Scale the whole element to unit length.
pub struct UnitLength;
/// Scale xyz to unit length, keep w.
pub struct UnitXyz;
/// `v = 1 - v`
pub struct FlipV;
/// Widen to RGBA with an opaque alpha.
pub struct OpaqueAlpha;

fn normalize_in_place(v: &mut [f32]) {
    let len = v.iter().map(|c| c * c).sum::<f32>().sqrt();
    if len > 0.0 {
        for c in v.iter_mut() {
            *c /= len;
        }
    }
}

impl Finish for Plain {
    #[inline]
    fn apply(_element: &mut [f32], _src: usize) {}
}

impl Finish for UnitLength {
    #[inline]
    fn apply(element: &mut [f32], _src: usize) {
        normalize_in_place(element);
    }
}

impl Finish for UnitXyz {
    #[inline]
    fn apply(element: &mut [f32], _src: usize) {
        normalize_in_place(&mut element[..3]);
    }
}

impl Finish for FlipV {
    #[inline]
    fn apply(element: &mut [f32], _src: usize) {
        element[1] = 1.0 - element[1];
    }
}

impl Finish for OpaqueAlpha {
    #[inline]
    fn width(_src: usize) -> usize {
        4
    }

    #[inline]
    fn apply(element: &mut [f32], src: usize) {
        if src < 4 {
            element[3] = 1.0;
        }
    }
}

// ============================================================================
// Routines
// ============================================================================

type F32Routine = fn(&ResolvedWindow<'_>, &mut [f32]) -> DecodeResult<()>;
type U16Routine = fn(&ResolvedWindow<'_>, &mut [u16]) -> DecodeResult<()>;
type U32Routine = fn(&ResolvedWindow<'_>, &mut [u32]) -> DecodeResult<()>;
type I32Routine = fn(&ResolvedWindow<'_>, &mut [i32]) -> DecodeResult<()>;

#[derive(Clone, Copy)]
enum Routine {
    F32(F32Routine),
    U16(U16Routine),
    U32(U32Routine),
    I32(I32Routine),
}

fn check_len(have: usize, need: usize) -> DecodeResult<()> {
    if have != need {
        return Err(DecodeError::structural(format!(
            "Destination holds {} values, conversion produces {}",
            have, need
        )));
    }
    Ok(())
}

fn decode_f32<C: Component, L: Layout, const NORM: bool, P: Finish>(
    window: &ResolvedWindow<'_>,
    out: &mut [f32],
) -> DecodeResult<()> {
    let src = window.num_components();
    let width = P::width(src);
    check_len(out.len(), window.count * width)?;
    let size = C::TYPE.size();

    L::visit(window, |i, element| {
        let dst = &mut out[i * width..(i + 1) * width];
        for (k, slot) in dst.iter_mut().take(src).enumerate() {
            let value = C::read_le(&element[k * size..]);
            *slot = if NORM {
                value.normalized()
            } else {
                value.to_f32_lossy()
            };
        }
        P::apply(dst, src);
    });
    Ok(())
}

fn decode_u16<C: Component, L: Layout>(window: &ResolvedWindow<'_>, out: &mut [u16]) -> DecodeResult<()> {
    let width = window.num_components();
    check_len(out.len(), window.count * width)?;
    let size = C::TYPE.size();

    L::visit(window, |i, element| {
        for (k, slot) in out[i * width..(i + 1) * width].iter_mut().enumerate() {
            *slot = C::read_le(&element[k * size..]).to_u16().unwrap_or(u16::MAX);
        }
    });
    Ok(())
}

fn decode_u32<C: Component, L: Layout>(window: &ResolvedWindow<'_>, out: &mut [u32]) -> DecodeResult<()> {
    check_len(out.len(), window.count)?;
    L::visit(window, |i, element| {
        out[i] = C::read_le(element).to_u32().unwrap_or(u32::MAX);
    });
    Ok(())
}

fn decode_indices<C: Component, L: Layout, const FLIP: bool>(
    window: &ResolvedWindow<'_>,
    out: &mut [i32],
) -> DecodeResult<()> {
    check_len(out.len(), window.count)?;
    if FLIP && window.count % 3 != 0 {
        return Err(DecodeError::structural(format!(
            "Cannot flip winding of {} indices, not a multiple of 3",
            window.count
        )));
    }

    let mut overflow = None;
    L::visit(window, |i, element| {
        let value = C::read_le(element);
        match value.to_i32() {
            Some(index) => out[i] = index,
            None => {
                overflow.get_or_insert(i);
            }
        }
    });
    if let Some(position) = overflow {
        return Err(DecodeError::structural(format!(
            "Index at position {} exceeds {}",
            position,
            i32::MAX
        )));
    }

    if FLIP {
        flip_triangles(out)?;
    }
    Ok(())
}

/// Reverses every index triple in place.
///
/// # Errors
///
/// Returns `DecodeError::Structural` if the length is not a multiple of 3.
pub fn flip_triangles<T>(indices: &mut [T]) -> DecodeResult<()> {
    if indices.len() % 3 != 0 {
        return Err(DecodeError::structural(format!(
            "Cannot flip winding of {} indices, not a multiple of 3",
            indices.len()
        )));
    }
    for triangle in indices.chunks_exact_mut(3) {
        triangle.swap(0, 2);
    }
    Ok(())
}

// ============================================================================
// Table
// ============================================================================

/// A selected conversion routine.
#[derive(Clone, Copy)]
pub struct Converter {
    key: ConverterKey,
    output: OutputKind,
    routine: Routine,
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converter")
            .field("key", &self.key)
            .field("output", &self.output)
            .finish()
    }
}

impl Converter {
    pub fn key(&self) -> ConverterKey {
        self.key
    }

    pub fn output(&self) -> OutputKind {
        self.output
    }

    /// Converts `window` into `dest`.
    ///
    /// # Errors
    ///
    /// `Structural` if `dest` has the wrong element type or does not hold
    /// exactly `window.count` elements, or if the routine rejects the data.
    pub fn run(&self, window: &ResolvedWindow<'_>, dest: &mut Destination<'_>) -> DecodeResult<()> {
        if dest.kind() != self.output {
            return Err(DecodeError::structural(format!(
                "Destination {:?} does not match {} output {:?}",
                dest.kind(),
                self.key,
                self.output
            )));
        }
        match (self.routine, dest) {
            (Routine::F32(routine), Destination::F32 { data, .. }) => routine(window, &mut **data),
            (Routine::U16(routine), Destination::U16 { data, .. }) => routine(window, &mut **data),
            (Routine::U32(routine), Destination::U32(data)) => routine(window, &mut **data),
            (Routine::I32(routine), Destination::I32(data)) => routine(window, &mut **data),
            _ => Err(DecodeError::structural(format!(
                "Destination type does not match {}",
                self.key
            ))),
        }
    }

    /// Converts `window` into newly allocated storage.
    pub fn convert(&self, window: &ResolvedWindow<'_>) -> DecodeResult<TypedArray> {
        let mut out = TypedArray::allocate(self.output, window.count)?;
        self.run(window, &mut out.as_destination())?;
        Ok(out)
    }
}

/// Selects the routine for one cell of the conversion table.
///
/// # Errors
///
/// Returns `DecodeError::UnsupportedFormat` for any combination not in the
/// table.
///
/// # Examples
/// ```
/// use glb_core::component_type::{AttributeShape, ComponentType};
/// use glb_core::convert::{select, ConverterKey, OutputKind, Semantic, Winding};
///
/// let key = ConverterKey {
///     semantic: Semantic::Color,
///     component_type: ComponentType::UInt8,
///     shape: AttributeShape::Vec3,
///     normalized: true,
///     interleaved: false,
///     winding: Winding::Preserve,
/// };
/// assert_eq!(select(key).unwrap().output(), OutputKind::F32(4));
///
/// let matrix_position = ConverterKey { semantic: Semantic::Position, shape: AttributeShape::Mat3, ..key };
/// assert!(select(matrix_position).is_err());
/// ```
pub fn select(key: ConverterKey) -> DecodeResult<Converter> {
    let selected = if key.interleaved {
        select_for::<Interleaved>(key)
    } else {
        select_for::<Packed>(key)
    };
    selected.ok_or_else(|| DecodeError::unsupported(format!("no converter for {}", key)))
}

fn float_cell<L: Layout, P: Finish>(ct: ComponentType, normalized: bool) -> F32Routine {
    use ComponentType::*;
    match (ct, normalized) {
        (Float32, _) => decode_f32::<f32, L, false, P>,
        (Int8, false) => decode_f32::<i8, L, false, P>,
        (Int8, true) => decode_f32::<i8, L, true, P>,
        (UInt8, false) => decode_f32::<u8, L, false, P>,
        (UInt8, true) => decode_f32::<u8, L, true, P>,
        (Int16, false) => decode_f32::<i16, L, false, P>,
        (Int16, true) => decode_f32::<i16, L, true, P>,
        (UInt16, false) => decode_f32::<u16, L, false, P>,
        (UInt16, true) => decode_f32::<u16, L, true, P>,
        (UInt32, false) => decode_f32::<u32, L, false, P>,
        (UInt32, true) => decode_f32::<u32, L, true, P>,
    }
}

fn index_cell<L: Layout>(ct: ComponentType, winding: Winding) -> Option<I32Routine> {
    use ComponentType::*;
    Some(match (ct, winding) {
        (UInt8, Winding::Preserve) => decode_indices::<u8, L, false>,
        (UInt8, Winding::Flip) => decode_indices::<u8, L, true>,
        (UInt16, Winding::Preserve) => decode_indices::<u16, L, false>,
        (UInt16, Winding::Flip) => decode_indices::<u16, L, true>,
        (UInt32, Winding::Preserve) => decode_indices::<u32, L, false>,
        (UInt32, Winding::Flip) => decode_indices::<u32, L, true>,
        _ => return None,
    })
}

fn sparse_index_cell<L: Layout>(ct: ComponentType) -> Option<U32Routine> {
    use ComponentType::*;
    Some(match ct {
        UInt8 => decode_u32::<u8, L>,
        UInt16 => decode_u32::<u16, L>,
        UInt32 => decode_u32::<u32, L>,
        _ => return None,
    })
}

fn joint_cell<L: Layout>(ct: ComponentType) -> Option<U16Routine> {
    use ComponentType::*;
    Some(match ct {
        UInt8 => decode_u16::<u8, L>,
        UInt16 => decode_u16::<u16, L>,
        _ => return None,
    })
}

/// i8, u8, i16 or u16.
fn is_small_int(ct: ComponentType) -> bool {
    ct.is_integral() && ct.size() <= 2
}

/// Matrix columns whose byte length is not a multiple of 4 are padded in
/// the buffer, so their elements are not tightly packed.
fn has_padded_columns(shape: AttributeShape, ct: ComponentType) -> bool {
    let rows = match shape {
        AttributeShape::Mat2 => 2,
        AttributeShape::Mat3 => 3,
        _ => return false,
    };
    rows * ct.size() % 4 != 0
}

fn is_color_int(ct: ComponentType) -> bool {
    matches!(ct, ComponentType::UInt8 | ComponentType::UInt16)
}

fn select_for<L: Layout>(key: ConverterKey) -> Option<Converter> {
    use AttributeShape::*;
    use ComponentType::Float32;

    let ct = key.component_type;
    let norm = key.normalized;
    let float = ct == Float32;
    let n = key.shape.num_components();

    let (routine, output) = match (key.semantic, key.shape) {
        (Semantic::Position, Vec3) if float || is_small_int(ct) => {
            (Routine::F32(float_cell::<L, Plain>(ct, norm)), OutputKind::F32(3))
        }

        (Semantic::Normal, Vec3) if float => (Routine::F32(float_cell::<L, Plain>(ct, false)), OutputKind::F32(3)),
        (Semantic::Normal, Vec3) if norm && ct.is_signed_integer() => {
            (Routine::F32(float_cell::<L, UnitLength>(ct, true)), OutputKind::F32(3))
        }

        (Semantic::Tangent, Vec4) if float => (Routine::F32(float_cell::<L, Plain>(ct, false)), OutputKind::F32(4)),
        (Semantic::Tangent, Vec4) if norm && ct.is_signed_integer() => {
            (Routine::F32(float_cell::<L, UnitXyz>(ct, true)), OutputKind::F32(4))
        }

        (Semantic::TexCoord, Vec2) if float || is_small_int(ct) => {
            (Routine::F32(float_cell::<L, FlipV>(ct, norm)), OutputKind::F32(2))
        }

        (Semantic::Color, Vec3 | Vec4) if float => {
            (Routine::F32(float_cell::<L, OpaqueAlpha>(ct, false)), OutputKind::F32(4))
        }
        (Semantic::Color, Vec3 | Vec4) if is_color_int(ct) => {
            (Routine::F32(float_cell::<L, OpaqueAlpha>(ct, true)), OutputKind::F32(4))
        }

        (Semantic::Generic, shape) if !has_padded_columns(shape, ct) => {
            (Routine::F32(float_cell::<L, Plain>(ct, norm && !float)), OutputKind::F32(n))
        }

        (Semantic::JointIndex, Vec4) => (Routine::U16(joint_cell::<L>(ct)?), OutputKind::U16(4)),

        (Semantic::JointWeight, Vec4) if float => {
            (Routine::F32(float_cell::<L, Plain>(ct, false)), OutputKind::F32(4))
        }
        (Semantic::JointWeight, Vec4) if norm && is_color_int(ct) => {
            (Routine::F32(float_cell::<L, Plain>(ct, true)), OutputKind::F32(4))
        }

        (Semantic::TriangleIndex, Scalar) if !norm => {
            (Routine::I32(index_cell::<L>(ct, key.winding)?), OutputKind::I32)
        }

        (Semantic::SparseIndex, Scalar) if !norm => (Routine::U32(sparse_index_cell::<L>(ct)?), OutputKind::U32),

        (Semantic::Rotation, Vec4) if float => (Routine::F32(float_cell::<L, Plain>(ct, false)), OutputKind::F32(4)),
        (Semantic::Rotation, Vec4) if norm && is_small_int(ct) => {
            (Routine::F32(float_cell::<L, UnitLength>(ct, true)), OutputKind::F32(4))
        }

        (Semantic::Matrix, Mat2 | Mat3 | Mat4) if float => {
            (Routine::F32(float_cell::<L, Plain>(ct, false)), OutputKind::F32(n))
        }

        _ => return None,
    };

    Some(Converter {
        key,
        output,
        routine,
    })
}
