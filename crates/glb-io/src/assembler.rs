//! Assembles mesh primitives from converted accessor data.
//!
//! Decoding a primitive happens in three steps:
//!
//! 1. [`OutputAssembler::plan`] resolves every recognised attribute, selects
//!    its converters, checks counts and topology, and allocates the output
//!    arrays of a [`DecodedPrimitive`].
//! 2. [`PrimitivePlan::units`] lends each output array to one
//!    [`ConversionUnit`], which the caller schedules in a batch.
//! 3. [`PrimitivePlan::finish`] applies the optional attribute policy to the
//!    unit reports and returns the primitive.

use glb_core::{
    flip_triangles, try_filled, AccessorResolver, DecodeError, DecodeResult, Destination, Semantic, Winding,
};

use crate::document::{GltfDocument, Primitive};
use crate::options::{DecodeOptions, OptionalAttributePolicy};
use crate::scheduler::{ConversionPlan, ConversionUnit, TaskScheduler, UnitLabel, UnitReport};

/// Output array a conversion unit writes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeSlot {
    Indices,
    Position,
    Normal,
    Tangent,
    TexCoord0,
    TexCoord1,
    Color0,
    Joints0,
    Weights0,
    /// A standalone accessor decoded outside a mesh.
    Accessor(usize),
}

impl AttributeSlot {
    /// Maps a glTF attribute name to its slot. Unrecognised names map to
    /// `None`.
    pub fn from_attribute_name(name: &str) -> Option<Self> {
        match name {
            "POSITION" => Some(AttributeSlot::Position),
            "NORMAL" => Some(AttributeSlot::Normal),
            "TANGENT" => Some(AttributeSlot::Tangent),
            "TEXCOORD_0" => Some(AttributeSlot::TexCoord0),
            "TEXCOORD_1" => Some(AttributeSlot::TexCoord1),
            "COLOR_0" => Some(AttributeSlot::Color0),
            "JOINTS_0" => Some(AttributeSlot::Joints0),
            "WEIGHTS_0" => Some(AttributeSlot::Weights0),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AttributeSlot::Indices => "indices",
            AttributeSlot::Position => "POSITION",
            AttributeSlot::Normal => "NORMAL",
            AttributeSlot::Tangent => "TANGENT",
            AttributeSlot::TexCoord0 => "TEXCOORD_0",
            AttributeSlot::TexCoord1 => "TEXCOORD_1",
            AttributeSlot::Color0 => "COLOR_0",
            AttributeSlot::Joints0 => "JOINTS_0",
            AttributeSlot::Weights0 => "WEIGHTS_0",
            AttributeSlot::Accessor(_) => "accessor",
        }
    }

    pub fn semantic(&self) -> Semantic {
        match self {
            AttributeSlot::Indices => Semantic::TriangleIndex,
            AttributeSlot::Position => Semantic::Position,
            AttributeSlot::Normal => Semantic::Normal,
            AttributeSlot::Tangent => Semantic::Tangent,
            AttributeSlot::TexCoord0 | AttributeSlot::TexCoord1 => Semantic::TexCoord,
            AttributeSlot::Color0 => Semantic::Color,
            AttributeSlot::Joints0 => Semantic::JointIndex,
            AttributeSlot::Weights0 => Semantic::JointWeight,
            AttributeSlot::Accessor(_) => Semantic::Generic,
        }
    }

    /// Required slots fail the primitive regardless of policy.
    pub fn is_required(&self) -> bool {
        matches!(
            self,
            AttributeSlot::Indices | AttributeSlot::Position | AttributeSlot::Accessor(_)
        )
    }
}

/// Primitive topology (`mode`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Topology {
    Points,
    Lines,
    LineLoop,
    LineStrip,
    #[default]
    Triangles,
    TriangleStrip,
    TriangleFan,
}

impl Topology {
    /// Maps a glTF `mode`; absent means triangles.
    pub fn from_mode(mode: Option<u32>) -> DecodeResult<Self> {
        match mode.unwrap_or(4) {
            0 => Ok(Topology::Points),
            1 => Ok(Topology::Lines),
            2 => Ok(Topology::LineLoop),
            3 => Ok(Topology::LineStrip),
            4 => Ok(Topology::Triangles),
            5 => Ok(Topology::TriangleStrip),
            6 => Ok(Topology::TriangleFan),
            other => Err(DecodeError::unsupported(format!("primitive mode {}", other))),
        }
    }
}

/// Axis-aligned position bounds from the POSITION accessor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl Bounds {
    fn from_accessor(min: Option<&[f32]>, max: Option<&[f32]>) -> Option<Self> {
        match (min?, max?) {
            (&[a, b, c], &[d, e, f]) => Some(Bounds {
                min: [a, b, c],
                max: [d, e, f],
            }),
            _ => None,
        }
    }
}

/// An optional attribute dropped under [`OptionalAttributePolicy::Skip`].
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedAttribute {
    pub attribute: String,
    pub error: DecodeError,
}

/// A mesh primitive ready for upload.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DecodedPrimitive {
    pub topology: Topology,
    pub indices: Vec<i32>,
    pub positions: Vec<[f32; 3]>,
    pub normals: Option<Vec<[f32; 3]>>,
    pub tangents: Option<Vec<[f32; 4]>>,
    pub tex_coords_0: Option<Vec<[f32; 2]>>,
    pub tex_coords_1: Option<Vec<[f32; 2]>>,
    pub colors: Option<Vec<[f32; 4]>>,
    pub joints: Option<Vec<[u16; 4]>>,
    pub weights: Option<Vec<[f32; 4]>>,
    pub bounds: Option<Bounds>,
    pub skipped: Vec<SkippedAttribute>,
}

impl DecodedPrimitive {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Number of triangles, for triangle-list primitives.
    pub fn triangle_count(&self) -> Option<usize> {
        (self.topology == Topology::Triangles).then(|| self.indices.len() / 3)
    }

    fn allocate(&mut self, slot: AttributeSlot, count: usize) -> DecodeResult<()> {
        match slot {
            AttributeSlot::Indices => self.indices = try_filled(0, count)?,
            AttributeSlot::Position => self.positions = try_filled([0.0; 3], count)?,
            AttributeSlot::Normal => self.normals = Some(try_filled([0.0; 3], count)?),
            AttributeSlot::Tangent => self.tangents = Some(try_filled([0.0; 4], count)?),
            AttributeSlot::TexCoord0 => self.tex_coords_0 = Some(try_filled([0.0; 2], count)?),
            AttributeSlot::TexCoord1 => self.tex_coords_1 = Some(try_filled([0.0; 2], count)?),
            AttributeSlot::Color0 => self.colors = Some(try_filled([0.0; 4], count)?),
            AttributeSlot::Joints0 => self.joints = Some(try_filled([0; 4], count)?),
            AttributeSlot::Weights0 => self.weights = Some(try_filled([0.0; 4], count)?),
            AttributeSlot::Accessor(_) => {}
        }
        Ok(())
    }

    fn clear(&mut self, slot: AttributeSlot) {
        match slot {
            AttributeSlot::Normal => self.normals = None,
            AttributeSlot::Tangent => self.tangents = None,
            AttributeSlot::TexCoord0 => self.tex_coords_0 = None,
            AttributeSlot::TexCoord1 => self.tex_coords_1 = None,
            AttributeSlot::Color0 => self.colors = None,
            AttributeSlot::Joints0 => self.joints = None,
            AttributeSlot::Weights0 => self.weights = None,
            AttributeSlot::Indices | AttributeSlot::Position | AttributeSlot::Accessor(_) => {}
        }
    }

    /// Borrows every allocated output array as a conversion destination.
    fn destinations(&mut self) -> Vec<(AttributeSlot, Destination<'_>)> {
        let mut out = vec![
            (AttributeSlot::Indices, Destination::I32(&mut self.indices)),
            (
                AttributeSlot::Position,
                Destination::F32 {
                    data: bytemuck::cast_slice_mut(self.positions.as_mut_slice()),
                    components: 3,
                },
            ),
        ];
        if let Some(normals) = &mut self.normals {
            out.push((
                AttributeSlot::Normal,
                Destination::F32 {
                    data: bytemuck::cast_slice_mut(normals.as_mut_slice()),
                    components: 3,
                },
            ));
        }
        if let Some(tangents) = &mut self.tangents {
            out.push((
                AttributeSlot::Tangent,
                Destination::F32 {
                    data: bytemuck::cast_slice_mut(tangents.as_mut_slice()),
                    components: 4,
                },
            ));
        }
        if let Some(uv) = &mut self.tex_coords_0 {
            out.push((
                AttributeSlot::TexCoord0,
                Destination::F32 {
                    data: bytemuck::cast_slice_mut(uv.as_mut_slice()),
                    components: 2,
                },
            ));
        }
        if let Some(uv) = &mut self.tex_coords_1 {
            out.push((
                AttributeSlot::TexCoord1,
                Destination::F32 {
                    data: bytemuck::cast_slice_mut(uv.as_mut_slice()),
                    components: 2,
                },
            ));
        }
        if let Some(colors) = &mut self.colors {
            out.push((
                AttributeSlot::Color0,
                Destination::F32 {
                    data: bytemuck::cast_slice_mut(colors.as_mut_slice()),
                    components: 4,
                },
            ));
        }
        if let Some(joints) = &mut self.joints {
            out.push((
                AttributeSlot::Joints0,
                Destination::U16 {
                    data: bytemuck::cast_slice_mut(joints.as_mut_slice()),
                    components: 4,
                },
            ));
        }
        if let Some(weights) = &mut self.weights {
            out.push((
                AttributeSlot::Weights0,
                Destination::F32 {
                    data: bytemuck::cast_slice_mut(weights.as_mut_slice()),
                    components: 4,
                },
            ));
        }
        out
    }
}

/// A primitive whose conversions are selected and whose storage is
/// allocated, waiting to be converted.
#[derive(Debug)]
pub struct PrimitivePlan<'a> {
    output: DecodedPrimitive,
    conversions: Vec<(AttributeSlot, ConversionPlan<'a>)>,
    policy: OptionalAttributePolicy,
}

impl<'a> PrimitivePlan<'a> {
    pub fn num_conversions(&self) -> usize {
        self.conversions.len()
    }

    /// One unit per planned conversion, labelled with `primitive`.
    pub fn units(&mut self, primitive: usize) -> Vec<ConversionUnit<'_>> {
        let PrimitivePlan {
            output, conversions, ..
        } = self;
        let mut destinations = output.destinations();
        let mut units = Vec::with_capacity(conversions.len());
        for (slot, plan) in conversions.iter() {
            if let Some(pos) = destinations.iter().position(|(s, _)| s == slot) {
                let (_, destination) = destinations.swap_remove(pos);
                units.push(ConversionUnit::new(UnitLabel::new(primitive, *slot), *plan, destination));
            }
        }
        units
    }

    /// Applies unit outcomes and returns the decoded primitive.
    ///
    /// The first failure of a required unit, or of any unit under
    /// [`OptionalAttributePolicy::Fail`], fails the primitive.
    pub fn finish(self, reports: impl IntoIterator<Item = UnitReport>) -> DecodeResult<DecodedPrimitive> {
        let mut output = self.output;
        for report in reports {
            let Err(error) = report.result else {
                continue;
            };
            let slot = report.label.slot;
            if slot.is_required() || self.policy == OptionalAttributePolicy::Fail {
                return Err(error);
            }
            log::warn!("Skipping {} attribute: {}", slot.name(), error);
            output.clear(slot);
            output.skipped.push(SkippedAttribute {
                attribute: slot.name().to_string(),
                error,
            });
        }
        Ok(output)
    }
}

/// Plans and decodes primitives of one document.
pub struct OutputAssembler<'r, 'a> {
    document: &'r GltfDocument,
    resolver: AccessorResolver<'r, 'a>,
    options: DecodeOptions,
}

impl<'r, 'a> OutputAssembler<'r, 'a> {
    pub fn new(document: &'r GltfDocument, resolver: AccessorResolver<'r, 'a>, options: DecodeOptions) -> Self {
        Self {
            document,
            resolver,
            options,
        }
    }

    /// Resolves accessor `index` and selects its converters for `semantic`.
    pub fn plan_accessor(
        &self,
        index: usize,
        semantic: Semantic,
        winding: Winding,
    ) -> DecodeResult<(ConversionPlan<'r>, glb_core::Accessor)> {
        let accessor = self.document.accessor(index)?;
        let window = self.resolver.resolve(&accessor)?;
        let sparse = self.resolver.resolve_sparse(&accessor)?;
        let plan = ConversionPlan::new(semantic, window, sparse, winding)?;
        Ok((plan, accessor))
    }

    /// Plans every conversion of `primitive` and allocates its output.
    ///
    /// # Errors
    ///
    /// Fails for a missing or undecodable POSITION, bad indices, an index
    /// count that does not form whole triangles, or (under
    /// [`OptionalAttributePolicy::Fail`]) any bad optional attribute.
    pub fn plan(&self, primitive: &Primitive) -> DecodeResult<PrimitivePlan<'r>> {
        let policy = self.options.optional_policy();
        let topology = Topology::from_mode(primitive.mode)?;
        let winding = match topology {
            Topology::Triangles => self.options.winding(),
            _ => Winding::Preserve,
        };

        let mut output = DecodedPrimitive {
            topology,
            ..Default::default()
        };
        let mut conversions = Vec::new();

        let position_index = *primitive
            .attributes
            .get("POSITION")
            .ok_or_else(|| DecodeError::structural("Primitive has no POSITION attribute"))?;
        let (position, accessor) = self.plan_accessor(position_index, Semantic::Position, Winding::Preserve)?;
        let vertex_count = position.count();
        output.bounds = Bounds::from_accessor(accessor.min.as_deref(), accessor.max.as_deref());
        output.allocate(AttributeSlot::Position, vertex_count)?;
        conversions.push((AttributeSlot::Position, position));

        match primitive.indices {
            Some(index) => {
                let (indices, _) = self.plan_accessor(index, Semantic::TriangleIndex, winding)?;
                check_triangles(topology, indices.count())?;
                output.allocate(AttributeSlot::Indices, indices.count())?;
                conversions.push((AttributeSlot::Indices, indices));
            }
            None => {
                check_triangles(topology, vertex_count)?;
                output.indices = sequential_indices(vertex_count, winding)?;
            }
        }

        for (name, &index) in &primitive.attributes {
            let Some(slot) = AttributeSlot::from_attribute_name(name) else {
                log::debug!("Ignoring attribute {}", name);
                continue;
            };
            if slot == AttributeSlot::Position {
                continue;
            }

            let planned = self
                .plan_accessor(index, slot.semantic(), Winding::Preserve)
                .and_then(|(plan, _)| {
                    if plan.count() == vertex_count {
                        Ok(plan)
                    } else {
                        Err(DecodeError::structural(format!(
                            "{} has {} elements, POSITION has {}",
                            name,
                            plan.count(),
                            vertex_count
                        )))
                    }
                });

            match planned {
                Ok(plan) => {
                    output.allocate(slot, vertex_count)?;
                    conversions.push((slot, plan));
                }
                Err(error) if policy == OptionalAttributePolicy::Skip => {
                    log::warn!("Skipping {} attribute: {}", name, error);
                    output.skipped.push(SkippedAttribute {
                        attribute: name.clone(),
                        error,
                    });
                }
                Err(error) => return Err(error),
            }
        }

        Ok(PrimitivePlan {
            output,
            conversions,
            policy,
        })
    }

    /// Decodes one primitive with its own batch.
    pub fn decode(&self, primitive: &Primitive, scheduler: &TaskScheduler) -> DecodeResult<DecodedPrimitive> {
        let mut plan = self.plan(primitive)?;
        let reports = {
            let mut batch = scheduler.batch();
            for unit in plan.units(0) {
                batch.enqueue(unit);
            }
            batch.wait_all_reports()
        };
        plan.finish(reports)
    }

    /// Decodes several primitives with a single batch.
    pub fn decode_many(
        &self,
        primitives: &[&Primitive],
        scheduler: &TaskScheduler,
    ) -> Vec<DecodeResult<DecodedPrimitive>> {
        let mut plans: Vec<DecodeResult<PrimitivePlan<'r>>> =
            primitives.iter().map(|primitive| self.plan(primitive)).collect();

        let reports = {
            let mut batch = scheduler.batch();
            for (i, plan) in plans.iter_mut().enumerate() {
                if let Ok(plan) = plan {
                    for unit in plan.units(i) {
                        batch.enqueue(unit);
                    }
                }
            }
            batch.wait_all_reports()
        };

        let mut grouped: Vec<Vec<UnitReport>> = vec![Vec::new(); plans.len()];
        for report in reports {
            grouped[report.label.primitive].push(report);
        }

        plans
            .into_iter()
            .zip(grouped)
            .map(|(plan, reports)| plan.and_then(|plan| plan.finish(reports)))
            .collect()
    }
}

fn check_triangles(topology: Topology, index_count: usize) -> DecodeResult<()> {
    if topology == Topology::Triangles && index_count % 3 != 0 {
        return Err(DecodeError::structural(format!(
            "Triangle primitive has {} indices, not a multiple of 3",
            index_count
        )));
    }
    Ok(())
}

fn sequential_indices(count: usize, winding: Winding) -> DecodeResult<Vec<i32>> {
    let last = i32::try_from(count)
        .map_err(|_| DecodeError::structural(format!("{} vertices exceed the index range", count)))?;
    let mut indices = try_filled(0, count)?;
    for (slot, value) in indices.iter_mut().zip(0..last) {
        *slot = value;
    }
    if winding == Winding::Flip {
        flip_triangles(&mut indices)?;
    }
    Ok(indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_names_roundtrip() {
        for name in [
            "POSITION",
            "NORMAL",
            "TANGENT",
            "TEXCOORD_0",
            "TEXCOORD_1",
            "COLOR_0",
            "JOINTS_0",
            "WEIGHTS_0",
        ] {
            let slot = AttributeSlot::from_attribute_name(name).unwrap();
            assert_eq!(slot.name(), name);
            assert_eq!(slot.is_required(), name == "POSITION");
        }
        assert_eq!(AttributeSlot::from_attribute_name("TEXCOORD_2"), None);
        assert_eq!(AttributeSlot::from_attribute_name("_CUSTOM"), None);
    }

    #[test]
    fn test_topology_from_mode() {
        assert_eq!(Topology::from_mode(None).unwrap(), Topology::Triangles);
        assert_eq!(Topology::from_mode(Some(1)).unwrap(), Topology::Lines);
        assert!(matches!(Topology::from_mode(Some(7)), Err(DecodeError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_sequential_indices() {
        assert_eq!(sequential_indices(6, Winding::Preserve).unwrap(), vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(sequential_indices(6, Winding::Flip).unwrap(), vec![2, 1, 0, 5, 4, 3]);
        assert!(sequential_indices(4, Winding::Flip).is_err());
    }

    #[test]
    fn test_bounds_need_three_components() {
        let b = Bounds::from_accessor(Some(&[0.0, 1.0, 2.0][..]), Some(&[3.0, 4.0, 5.0][..])).unwrap();
        assert_eq!(b.min, [0.0, 1.0, 2.0]);
        assert_eq!(b.max, [3.0, 4.0, 5.0]);
        assert!(Bounds::from_accessor(Some(&[0.0][..]), Some(&[1.0][..])).is_none());
        assert!(Bounds::from_accessor(None, Some(&[1.0, 1.0, 1.0][..])).is_none());
    }

    #[test]
    fn test_destinations_cover_allocated_slots() {
        let mut output = DecodedPrimitive::default();
        output.allocate(AttributeSlot::Position, 2).unwrap();
        output.allocate(AttributeSlot::Joints0, 2).unwrap();
        output.allocate(AttributeSlot::Indices, 3).unwrap();
        let destinations = output.destinations();
        let slots: Vec<_> = destinations.iter().map(|(slot, _)| *slot).collect();
        assert_eq!(
            slots,
            vec![AttributeSlot::Indices, AttributeSlot::Position, AttributeSlot::Joints0]
        );
        assert_eq!(destinations[1].1.len(), 6);
        assert_eq!(destinations[2].1.len(), 8);
    }

    #[test]
    fn test_allocate_oversized_slot_fails() {
        let mut output = DecodedPrimitive::default();
        let err = output.allocate(AttributeSlot::Tangent, usize::MAX / 4).unwrap_err();
        assert!(matches!(err, DecodeError::Bounds(_)));
        assert!(output.tangents.is_none());
    }

    #[test]
    fn test_finish_applies_policy() {
        let mut output = DecodedPrimitive::default();
        output.allocate(AttributeSlot::Position, 1).unwrap();
        output.allocate(AttributeSlot::Normal, 1).unwrap();
        let failure = UnitReport {
            label: UnitLabel::new(0, AttributeSlot::Normal),
            result: Err(DecodeError::bounds("normals")),
        };

        let skip = PrimitivePlan {
            output: output.clone(),
            conversions: Vec::new(),
            policy: OptionalAttributePolicy::Skip,
        };
        let decoded = skip.finish(vec![failure.clone()]).unwrap();
        assert!(decoded.normals.is_none());
        assert_eq!(decoded.skipped.len(), 1);
        assert_eq!(decoded.skipped[0].attribute, "NORMAL");

        let fail = PrimitivePlan {
            output: output.clone(),
            conversions: Vec::new(),
            policy: OptionalAttributePolicy::Fail,
        };
        assert_eq!(fail.finish(vec![failure]).unwrap_err(), DecodeError::bounds("normals"));

        let required = PrimitivePlan {
            output,
            conversions: Vec::new(),
            policy: OptionalAttributePolicy::Skip,
        };
        let position_failure = UnitReport {
            label: UnitLabel::new(0, AttributeSlot::Position),
            result: Err(DecodeError::bounds("positions")),
        };
        assert!(required.finish(vec![position_failure]).is_err());
    }
}
