//! Property tests for the conversion table, sparse patching and window bounds.

use std::borrow::Cow;

use glb_core::{
    flip_triangles, select, Accessor, AccessorResolver, AttributeShape, Buffer, BufferRegistry, BufferView,
    ChunkWindow, Component, ComponentType, ConverterKey, DecodeError, Destination, ResolvedWindow, Semantic,
    SparsePatcher, SparseWindows, TypedArray, Winding,
};
use proptest::prelude::*;

fn convert_f32(semantic: Semantic, window: &ResolvedWindow<'_>) -> Vec<f32> {
    let converter = select(ConverterKey::for_window(semantic, window, Winding::Preserve)).unwrap();
    match converter.convert(window).unwrap() {
        TypedArray::F32 { data, .. } => data,
        other => panic!("expected f32 output, got {:?}", other.kind()),
    }
}

fn generic_scalar(bytes: &[u8], ct: ComponentType, count: usize) -> Vec<f32> {
    let window = ResolvedWindow::packed(bytes, AttributeShape::Scalar, ct, count, true).unwrap();
    convert_f32(Semantic::Generic, &window)
}

// ============================================================================
// 1. Normalization
// ============================================================================

#[test]
fn test_normalized_extremes_within_tolerance() {
    let i8s = generic_scalar(&[i8::MIN as u8, i8::MAX as u8], ComponentType::Int8, 2);
    assert!((i8s[0] + 1.0).abs() < 1e-4);
    assert!((i8s[1] - 1.0).abs() < 1e-4);

    let u8s = generic_scalar(&[u8::MIN, u8::MAX], ComponentType::UInt8, 2);
    assert!(u8s[0].abs() < 1e-4);
    assert!((u8s[1] - 1.0).abs() < 1e-4);

    let bytes: Vec<u8> = [i16::MIN, i16::MAX].iter().flat_map(|v| v.to_le_bytes()).collect();
    let i16s = generic_scalar(&bytes, ComponentType::Int16, 2);
    assert!((i16s[0] + 1.0).abs() < 1e-5);
    assert!((i16s[1] - 1.0).abs() < 1e-5);

    let bytes: Vec<u8> = [u16::MIN, u16::MAX].iter().flat_map(|v| v.to_le_bytes()).collect();
    let u16s = generic_scalar(&bytes, ComponentType::UInt16, 2);
    assert!(u16s[0].abs() < 1e-5);
    assert!((u16s[1] - 1.0).abs() < 1e-5);
}

proptest! {
    #[test]
    fn signed_normalized_in_unit_range(values in prop::collection::vec(any::<i16>(), 1..64)) {
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        let out = generic_scalar(&bytes, ComponentType::Int16, values.len());
        for (raw, decoded) in values.iter().zip(&out) {
            prop_assert!((-1.0..=1.0).contains(decoded));
            prop_assert!((decoded - raw.normalized()).abs() < 1e-6);
        }
    }

    #[test]
    fn unsigned_normalized_in_unit_range(values in prop::collection::vec(any::<u8>(), 1..64)) {
        let out = generic_scalar(&values, ComponentType::UInt8, values.len());
        for (raw, decoded) in values.iter().zip(&out) {
            prop_assert!((0.0..=1.0).contains(decoded));
            prop_assert!((decoded - *raw as f32 / 255.0).abs() < 1e-6);
        }
    }
}

// ============================================================================
// 2. Texture coordinate flip
// ============================================================================

proptest! {
    #[test]
    fn uv_flip_u16_normalized(u in any::<u16>(), v in any::<u16>()) {
        let bytes: Vec<u8> = [u, v].iter().flat_map(|x| x.to_le_bytes()).collect();
        let window = ResolvedWindow::packed(&bytes, AttributeShape::Vec2, ComponentType::UInt16, 1, true).unwrap();
        let out = convert_f32(Semantic::TexCoord, &window);
        prop_assert_eq!(out[0], u.normalized());
        prop_assert_eq!(out[1], 1.0 - v.normalized());
    }

    #[test]
    fn uv_flip_i8_normalized(u in any::<i8>(), v in any::<i8>()) {
        let bytes = [u as u8, v as u8];
        let window = ResolvedWindow::packed(&bytes, AttributeShape::Vec2, ComponentType::Int8, 1, true).unwrap();
        let out = convert_f32(Semantic::TexCoord, &window);
        prop_assert_eq!(out[1], 1.0 - v.normalized());
    }

    #[test]
    fn uv_flip_u8_normalized(u in any::<u8>(), v in any::<u8>()) {
        let bytes = [u, v];
        let window = ResolvedWindow::packed(&bytes, AttributeShape::Vec2, ComponentType::UInt8, 1, true).unwrap();
        let out = convert_f32(Semantic::TexCoord, &window);
        prop_assert_eq!(out[1], 1.0 - v.normalized());
    }

    #[test]
    fn uv_flip_i16_normalized(u in any::<i16>(), v in any::<i16>()) {
        let bytes: Vec<u8> = [u, v].iter().flat_map(|x| x.to_le_bytes()).collect();
        let window = ResolvedWindow::packed(&bytes, AttributeShape::Vec2, ComponentType::Int16, 1, true).unwrap();
        let out = convert_f32(Semantic::TexCoord, &window);
        prop_assert_eq!(out[1], 1.0 - v.normalized());
    }

    #[test]
    fn uv_flip_f32(u in -4.0f32..4.0, v in -4.0f32..4.0) {
        let bytes: Vec<u8> = [u, v].iter().flat_map(|x| x.to_le_bytes()).collect();
        let window = ResolvedWindow::packed(&bytes, AttributeShape::Vec2, ComponentType::Float32, 1, false).unwrap();
        let out = convert_f32(Semantic::TexCoord, &window);
        prop_assert_eq!(out[0], u);
        prop_assert_eq!(out[1], 1.0 - v);
    }
}

// ============================================================================
// 3. Winding flip
// ============================================================================

fn triangles() -> impl Strategy<Value = Vec<u32>> {
    prop::collection::vec(0u32..100_000, 0..40).prop_map(|mut v| {
        v.truncate(v.len() / 3 * 3);
        v
    })
}

proptest! {
    #[test]
    fn flip_is_an_involution(indices in triangles()) {
        let bytes: Vec<u8> = indices.iter().flat_map(|i| i.to_le_bytes()).collect();
        let window = ResolvedWindow::packed(&bytes, AttributeShape::Scalar, ComponentType::UInt32, indices.len(), false)
            .unwrap();
        let flip = select(ConverterKey::for_window(Semantic::TriangleIndex, &window, Winding::Flip)).unwrap();
        let flipped = flip.convert(&window).unwrap();
        let mut twice = flipped.as_i32().unwrap().to_vec();
        flip_triangles(&mut twice).unwrap();

        let expected: Vec<i32> = indices.iter().map(|&i| i as i32).collect();
        prop_assert_eq!(twice, expected);
    }

    #[test]
    fn flip_reverses_each_triple(indices in triangles()) {
        let bytes: Vec<u8> = indices.iter().flat_map(|i| i.to_le_bytes()).collect();
        let window = ResolvedWindow::packed(&bytes, AttributeShape::Scalar, ComponentType::UInt32, indices.len(), false)
            .unwrap();
        let flip = select(ConverterKey::for_window(Semantic::TriangleIndex, &window, Winding::Flip)).unwrap();
        let out = flip.convert(&window).unwrap();
        for (tri, src) in out.as_i32().unwrap().chunks_exact(3).zip(indices.chunks_exact(3)) {
            prop_assert_eq!(tri, &[src[2] as i32, src[1] as i32, src[0] as i32][..]);
        }
    }
}

// ============================================================================
// 4. Sparse patching
// ============================================================================

proptest! {
    #[test]
    fn sparse_patch_is_idempotent(
        base in prop::collection::vec(-10.0f32..10.0, 3..30),
        pairs in prop::collection::vec((0u16..10, -10.0f32..10.0), 0..12),
    ) {
        let count = base.len();
        let pairs: Vec<(u16, f32)> = pairs.into_iter().map(|(i, v)| (i % count as u16, v)).collect();
        let index_bytes: Vec<u8> = pairs.iter().flat_map(|(i, _)| i.to_le_bytes()).collect();
        let value_bytes: Vec<u8> = pairs.iter().flat_map(|(_, v)| v.to_le_bytes()).collect();

        let windows = SparseWindows {
            indices: ResolvedWindow::packed(&index_bytes, AttributeShape::Scalar, ComponentType::UInt16, pairs.len(), false)
                .unwrap(),
            values: ResolvedWindow::packed(&value_bytes, AttributeShape::Scalar, ComponentType::Float32, pairs.len(), false)
                .unwrap(),
        };
        let key = ConverterKey {
            semantic: Semantic::Generic,
            component_type: ComponentType::Float32,
            shape: AttributeShape::Scalar,
            normalized: false,
            interleaved: false,
            winding: Winding::Preserve,
        };
        let patcher = SparsePatcher::new(windows, key).unwrap();

        let mut once = base.clone();
        patcher.apply(&mut Destination::F32 { data: &mut once, components: 1 }).unwrap();
        let mut twice = once.clone();
        patcher.apply(&mut Destination::F32 { data: &mut twice, components: 1 }).unwrap();
        prop_assert_eq!(&once, &twice);

        // Last write wins for every patched slot.
        for (slot, value) in once.iter().enumerate() {
            match pairs.iter().rev().find(|(i, _)| *i as usize == slot) {
                Some((_, v)) => prop_assert_eq!(value, v),
                None => prop_assert_eq!(value, &base[slot]),
            }
        }
    }
}

// ============================================================================
// 5. Window bounds
// ============================================================================

fn shapes() -> impl Strategy<Value = AttributeShape> {
    prop_oneof![
        Just(AttributeShape::Scalar),
        Just(AttributeShape::Vec2),
        Just(AttributeShape::Vec3),
        Just(AttributeShape::Vec4),
        Just(AttributeShape::Mat4),
    ]
}

fn component_types() -> impl Strategy<Value = ComponentType> {
    prop_oneof![
        Just(ComponentType::Int8),
        Just(ComponentType::UInt16),
        Just(ComponentType::Float32),
    ]
}

proptest! {
    #[test]
    fn exact_fill_is_in_bounds_and_one_more_byte_is_not(
        shape in shapes(),
        ct in component_types(),
        count in 1usize..50,
        offset in 0usize..16,
    ) {
        let data_len = count * shape.num_components() * ct.size();
        let bytes = vec![0u8; offset + data_len];
        let mut registry = BufferRegistry::new();
        registry.insert(Buffer::new(0, Cow::Borrowed(&bytes[..]), ChunkWindow::new(0, bytes.len())).unwrap());
        let views = [BufferView { buffer: 0, byte_offset: 0, byte_length: bytes.len(), byte_stride: None }];
        let resolver = AccessorResolver::new(&views, &registry);

        let mut accessor = Accessor::new(Some(0), ct, shape, count);
        accessor.byte_offset = offset;
        let window = resolver.resolve(&accessor).unwrap();
        prop_assert_eq!(window.bytes.unwrap().len(), data_len);

        accessor.byte_offset = offset + 1;
        prop_assert!(matches!(resolver.resolve(&accessor), Err(DecodeError::Bounds(_))));
    }
}
