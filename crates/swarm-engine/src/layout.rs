//! Vertex-array descriptors: buffers bound to program input slots.
//!
//! A `VertexArray` aggregates one or more buffers. Each buffer carries an
//! ordered attribute map; byte offsets are the running sum of the preceding
//! attributes' sizes inside the same buffer. Scalars are always 4 bytes.
//!
//! The binder trusts the caller: the stride and the derived offsets must
//! describe the data actually packed in the buffer. A mismatch is not detected
//! here and shows up as garbage on screen.

use crate::error::{SimError, SimResult};

/// Scalar component type of an attribute. All supported types are 32-bit.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ScalarType {
    Float32,
    Sint32,
    Uint32,
}

impl ScalarType {
    /// Size of one component in bytes.
    pub const SIZE: u64 = 4;

    /// Maps `components` scalars of this type to a wgpu vertex format.
    pub fn vertex_format(self, components: u32) -> Option<wgpu::VertexFormat> {
        use wgpu::VertexFormat as F;
        let format = match (self, components) {
            (Self::Float32, 1) => F::Float32,
            (Self::Float32, 2) => F::Float32x2,
            (Self::Float32, 3) => F::Float32x3,
            (Self::Float32, 4) => F::Float32x4,
            (Self::Sint32, 1) => F::Sint32,
            (Self::Sint32, 2) => F::Sint32x2,
            (Self::Sint32, 3) => F::Sint32x3,
            (Self::Sint32, 4) => F::Sint32x4,
            (Self::Uint32, 1) => F::Uint32,
            (Self::Uint32, 2) => F::Uint32x2,
            (Self::Uint32, 3) => F::Uint32x3,
            (Self::Uint32, 4) => F::Uint32x4,
            _ => return None,
        };
        Some(format)
    }
}

/// How one named attribute is fed to the program.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct AttributeDescriptor {
    /// Program input slot.
    pub location: u32,
    /// Number of scalar components (1..=4).
    pub components: u32,
    pub scalar: ScalarType,
    /// Per-instance step divisor. `None` or `Some(0)` advances per vertex.
    pub divisor: Option<u32>,
}

impl AttributeDescriptor {
    pub const fn new(location: u32, components: u32, scalar: ScalarType) -> Self {
        Self {
            location,
            components,
            scalar,
            divisor: None,
        }
    }

    pub const fn float(location: u32, components: u32) -> Self {
        Self::new(location, components, ScalarType::Float32)
    }

    /// Advances this attribute once per `divisor` instances.
    pub const fn per_instance(mut self, divisor: u32) -> Self {
        self.divisor = Some(divisor);
        self
    }

    /// Size of this attribute in bytes.
    pub fn byte_size(&self) -> u64 {
        self.components as u64 * ScalarType::SIZE
    }
}

/// Attribute name → descriptor, in declaration order.
///
/// Names are unique: inserting an existing name replaces its descriptor but
/// keeps its original position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeMap {
    entries: Vec<(String, AttributeDescriptor)>,
}

impl AttributeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, desc: AttributeDescriptor) -> Self {
        self.insert(name, desc);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, desc: AttributeDescriptor) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = desc,
            None => self.entries.push((name, desc)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&AttributeDescriptor> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, d)| d)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeDescriptor)> {
        self.entries.iter().map(|(n, d)| (n.as_str(), d))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Byte offset of every attribute, in declaration order.
///
/// Offsets accumulate `components × 4` within one buffer binding only.
pub fn attribute_offsets(attributes: &AttributeMap) -> Vec<(&str, u64)> {
    let mut offset = 0u64;
    attributes
        .iter()
        .map(|(name, desc)| {
            let at = offset;
            offset += desc.byte_size();
            (name, at)
        })
        .collect()
}

/// One attribute-pointer configuration, as handed to the device.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributePointer {
    pub name: String,
    pub location: u32,
    pub components: u32,
    pub scalar: ScalarType,
    pub normalized: bool,
    pub stride: u64,
    pub offset: u64,
    pub step_mode: wgpu::VertexStepMode,
}

/// Resolved layout of one buffer inside a vertex array.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferLayout {
    pub stride: u64,
    pub step_mode: wgpu::VertexStepMode,
    pub pointers: Vec<AttributePointer>,
    attributes: Vec<wgpu::VertexAttribute>,
}

impl BufferLayout {
    /// Resolves offsets, formats and the step mode for one buffer binding.
    ///
    /// `array` only labels errors.
    pub fn resolve(array: &str, stride: u64, attributes: &AttributeMap) -> SimResult<Self> {
        let mut step_mode = None;
        let mut pointers = Vec::with_capacity(attributes.len());
        let mut raw = Vec::with_capacity(attributes.len());

        for ((name, desc), (_, offset)) in attributes.iter().zip(attribute_offsets(attributes)) {
            let format = desc.scalar.vertex_format(desc.components).ok_or_else(|| {
                SimError::layout(
                    array,
                    format!("`{name}` has {} components; 1 to 4 are supported", desc.components),
                )
            })?;

            let step = match desc.divisor {
                None | Some(0) => wgpu::VertexStepMode::Vertex,
                Some(1) => wgpu::VertexStepMode::Instance,
                Some(d) => {
                    return Err(SimError::layout(
                        array,
                        format!("`{name}` uses instance divisor {d}; only 1 is supported"),
                    ));
                }
            };
            match step_mode {
                None => step_mode = Some(step),
                Some(existing) if existing != step => {
                    return Err(SimError::layout(
                        array,
                        format!("`{name}` mixes per-vertex and per-instance stepping in one buffer"),
                    ));
                }
                Some(_) => {}
            }

            raw.push(wgpu::VertexAttribute {
                format,
                offset,
                shader_location: desc.location,
            });
            pointers.push(AttributePointer {
                name: name.to_string(),
                location: desc.location,
                components: desc.components,
                scalar: desc.scalar,
                normalized: false,
                stride,
                offset,
                step_mode: step,
            });
        }

        Ok(Self {
            stride,
            step_mode: step_mode.unwrap_or(wgpu::VertexStepMode::Vertex),
            pointers,
            attributes: raw,
        })
    }

    pub fn pointer(&self, name: &str) -> Option<&AttributePointer> {
        self.pointers.iter().find(|p| p.name == name)
    }

    pub fn vertex_layout(&self) -> wgpu::VertexBufferLayout<'_> {
        wgpu::VertexBufferLayout {
            array_stride: self.stride,
            step_mode: self.step_mode,
            attributes: &self.attributes,
        }
    }
}

/// A buffer plus the attributes it feeds, before layout resolution.
pub struct BufferBinding {
    pub buffer: wgpu::Buffer,
    pub stride: u64,
    pub attributes: AttributeMap,
}

/// A buffer with its resolved layout.
pub struct BoundBuffer {
    pub buffer: wgpu::Buffer,
    pub layout: BufferLayout,
}

/// Named aggregate of bound buffers; the vertex-array descriptor.
pub struct VertexArray {
    label: String,
    buffers: Vec<BoundBuffer>,
}

impl VertexArray {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn buffers(&self) -> &[BoundBuffer] {
        &self.buffers
    }

    /// Layouts in buffer-slot order, for pipeline creation.
    pub fn vertex_layouts(&self) -> Vec<wgpu::VertexBufferLayout<'_>> {
        self.buffers.iter().map(|b| b.layout.vertex_layout()).collect()
    }

    /// Looks up an attribute pointer across all buffers.
    pub fn pointer(&self, name: &str) -> Option<&AttributePointer> {
        self.buffers.iter().find_map(|b| b.layout.pointer(name))
    }

    /// Binds every buffer to its slot on a render pass.
    pub fn bind(&self, pass: &mut wgpu::RenderPass<'_>) {
        for (slot, bound) in self.buffers.iter().enumerate() {
            pass.set_vertex_buffer(slot as u32, bound.buffer.slice(..));
        }
    }
}

/// Builds a vertex array from an ordered list of buffer bindings.
pub fn bind_layout(label: &str, bindings: Vec<BufferBinding>) -> SimResult<VertexArray> {
    let mut buffers = Vec::with_capacity(bindings.len());
    for binding in bindings {
        let layout = BufferLayout::resolve(label, binding.stride, &binding.attributes)?;
        buffers.push(BoundBuffer {
            buffer: binding.buffer,
            layout,
        });
    }
    log::trace!("vertex array \"{label}\" bound with {} buffer(s)", buffers.len());
    Ok(VertexArray {
        label: label.to_string(),
        buffers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn particle_attrs() -> AttributeMap {
        AttributeMap::new()
            .with("i_Position", AttributeDescriptor::float(0, 2))
            .with("i_Velocity", AttributeDescriptor::float(1, 2))
    }

    // ── offsets ───────────────────────────────────────────────────────────

    #[test]
    fn particle_offsets_are_packed() {
        let attrs = particle_attrs();
        let offsets = attribute_offsets(&attrs);
        assert_eq!(offsets, vec![("i_Position", 0), ("i_Velocity", 8)]);
    }

    #[test]
    fn offsets_follow_declaration_order() {
        let attrs = AttributeMap::new()
            .with("i_Velocity", AttributeDescriptor::float(1, 2))
            .with("i_Position", AttributeDescriptor::float(0, 2));
        let offsets = attribute_offsets(&attrs);
        assert_eq!(offsets, vec![("i_Velocity", 0), ("i_Position", 8)]);
    }

    #[test]
    fn offsets_mix_component_counts() {
        let attrs = AttributeMap::new()
            .with("a", AttributeDescriptor::float(0, 3))
            .with("b", AttributeDescriptor::new(1, 1, ScalarType::Uint32))
            .with("c", AttributeDescriptor::float(2, 4));
        let offsets: Vec<u64> = attribute_offsets(&attrs).into_iter().map(|(_, o)| o).collect();
        assert_eq!(offsets, vec![0, 12, 16]);
    }

    #[test]
    fn reinserting_a_name_keeps_its_slot() {
        let mut attrs = particle_attrs();
        attrs.insert("i_Position", AttributeDescriptor::float(5, 2));
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs.get("i_Position").unwrap().location, 5);
        assert_eq!(attribute_offsets(&attrs)[0], ("i_Position", 0));
    }

    // ── resolve ───────────────────────────────────────────────────────────

    #[test]
    fn resolve_emits_one_pointer_per_attribute() {
        let layout = BufferLayout::resolve("update", 16, &particle_attrs()).unwrap();
        assert_eq!(layout.pointers.len(), 2);

        let vel = layout.pointer("i_Velocity").unwrap();
        assert_eq!(vel.location, 1);
        assert_eq!(vel.offset, 8);
        assert_eq!(vel.stride, 16);
        assert!(!vel.normalized);
        assert_eq!(layout.step_mode, wgpu::VertexStepMode::Vertex);

        let raw = layout.vertex_layout();
        assert_eq!(raw.array_stride, 16);
        assert_eq!(raw.attributes[1].format, wgpu::VertexFormat::Float32x2);
        assert_eq!(raw.attributes[1].offset, 8);
    }

    #[test]
    fn divisor_one_steps_per_instance() {
        let attrs = AttributeMap::new()
            .with("i_Position", AttributeDescriptor::float(0, 2).per_instance(1));
        let layout = BufferLayout::resolve("render", 16, &attrs).unwrap();
        assert_eq!(layout.step_mode, wgpu::VertexStepMode::Instance);
    }

    #[test]
    fn divisor_zero_steps_per_vertex() {
        let attrs = AttributeMap::new().with("a", AttributeDescriptor::float(0, 2).per_instance(0));
        let layout = BufferLayout::resolve("render", 8, &attrs).unwrap();
        assert_eq!(layout.step_mode, wgpu::VertexStepMode::Vertex);
    }

    #[test]
    fn divisor_above_one_is_rejected() {
        let attrs = AttributeMap::new().with("a", AttributeDescriptor::float(0, 2).per_instance(3));
        let err = BufferLayout::resolve("render", 8, &attrs).unwrap_err();
        assert!(matches!(err, SimError::Layout { .. }));
    }

    #[test]
    fn mixed_step_modes_are_rejected() {
        let attrs = AttributeMap::new()
            .with("a", AttributeDescriptor::float(0, 2).per_instance(1))
            .with("b", AttributeDescriptor::float(1, 2));
        assert!(BufferLayout::resolve("render", 16, &attrs).is_err());
    }

    #[test]
    fn five_components_are_rejected() {
        let attrs = AttributeMap::new().with("a", AttributeDescriptor::float(0, 5));
        assert!(BufferLayout::resolve("render", 20, &attrs).is_err());
    }

    #[test]
    fn stride_is_not_checked_against_offsets() {
        // Caller-enforced precondition: a short stride is passed through as-is.
        let layout = BufferLayout::resolve("update", 12, &particle_attrs()).unwrap();
        assert_eq!(layout.stride, 12);
        assert_eq!(layout.pointer("i_Velocity").unwrap().offset, 8);
    }
}
