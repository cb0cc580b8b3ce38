//! Program builder: compiles WGSL stages and links them into executables.
//!
//! Compilation and linking are checked on the CPU (see `reflect`) before any
//! device object is created, so failures surface as typed errors carrying the
//! compiler report instead of device panics.

mod reflect;

use std::borrow::Cow;

use crate::device::scoped;
use crate::error::{SimError, SimResult};
use crate::layout::VertexArray;

pub use reflect::{
    CAPTURE_RECORD_BINDING, INPUT_RECORD_BINDING, InterfaceVar, ProgramInterface, RecordField,
    RecordLayout,
};

/// Pipeline stage a source is compiled for.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum StageKind {
    Vertex,
    Fragment,
    Compute,
}

impl StageKind {
    pub(crate) fn naga_stage(self) -> naga::ShaderStage {
        match self {
            Self::Vertex => naga::ShaderStage::Vertex,
            Self::Fragment => naga::ShaderStage::Fragment,
            Self::Compute => naga::ShaderStage::Compute,
        }
    }

    /// Conventional entry point name.
    pub fn default_entry_point(self) -> &'static str {
        match self {
            Self::Vertex => "vs_main",
            Self::Fragment => "fs_main",
            Self::Compute => "cs_main",
        }
    }
}

/// Source text of one stage plus the logical name used in diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSource {
    pub name: String,
    pub kind: StageKind,
    pub source: String,
    pub entry_point: String,
}

impl StageSource {
    pub fn new(name: impl Into<String>, kind: StageKind, source: String) -> Self {
        Self {
            name: name.into(),
            kind,
            source,
            entry_point: kind.default_entry_point().to_string(),
        }
    }

    pub fn with_entry_point(mut self, entry_point: impl Into<String>) -> Self {
        self.entry_point = entry_point.into();
        self
    }
}

/// Which pass a program drives.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ProgramKind {
    /// Computes the next state and captures it; never rasterizes.
    Update,
    /// Rasterizes instanced sprites.
    Render,
}

struct CompiledStage {
    kind: StageKind,
    entry_point: String,
    module: wgpu::ShaderModule,
}

/// A compiled and linked program.
///
/// Created once at initialization and never recompiled.
pub struct Program {
    label: String,
    kind: ProgramKind,
    stages: Vec<CompiledStage>,
    interface: ProgramInterface,
}

impl Program {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> ProgramKind {
        self.kind
    }

    /// Slot of a named program input, if the program reads it.
    pub fn attribute(&self, name: &str) -> Option<u32> {
        self.interface
            .inputs
            .iter()
            .find(|v| v.name == name)
            .map(|v| v.location)
    }

    pub fn interface(&self) -> &ProgramInterface {
        &self.interface
    }

    /// Layout of the record read by an update program.
    pub fn input_record(&self) -> Option<&RecordLayout> {
        self.interface.input_record.as_ref()
    }

    /// Layout of the captured record, when outputs were declared.
    pub fn capture_layout(&self) -> Option<&RecordLayout> {
        self.interface.capture.as_ref()
    }

    fn stage(&self, kind: StageKind) -> SimResult<&CompiledStage> {
        self.stages
            .iter()
            .find(|s| s.kind == kind)
            .ok_or_else(|| SimError::link(&self.label, format!("program has no {kind:?} stage")))
    }

    /// Checks that `array` feeds every program input with a matching shape.
    pub fn check_vertex_inputs(&self, array: &VertexArray) -> SimResult<()> {
        for input in &self.interface.inputs {
            let Some(ptr) = array
                .buffers()
                .iter()
                .flat_map(|b| b.layout.pointers.iter())
                .find(|p| p.location == input.location)
            else {
                return Err(SimError::link(
                    &self.label,
                    format!(
                        "input `{}` at location {} is not fed by vertex array \"{}\"",
                        input.name,
                        input.location,
                        array.label()
                    ),
                ));
            };
            if ptr.components != input.components || ptr.scalar != input.scalar {
                return Err(SimError::link(
                    &self.label,
                    format!(
                        "`{}` is {}x{:?} in \"{}\" but the program reads {}x{:?}",
                        ptr.name,
                        ptr.components,
                        ptr.scalar,
                        array.label(),
                        input.components,
                        input.scalar
                    ),
                ));
            }
        }
        for bound in array.buffers() {
            for ptr in &bound.layout.pointers {
                let end = ptr.offset + ptr.components as u64 * crate::layout::ScalarType::SIZE;
                if end > bound.layout.stride {
                    return Err(SimError::link(
                        &self.label,
                        format!(
                            "`{}` ends at byte {end}, past the {}-byte stride of \"{}\"",
                            ptr.name,
                            bound.layout.stride,
                            array.label()
                        ),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Builds the rasterizing pipeline for a render program.
    pub fn render_pipeline(
        &self,
        device: &wgpu::Device,
        array: &VertexArray,
        bind_group_layouts: &[&wgpu::BindGroupLayout],
        target: wgpu::ColorTargetState,
    ) -> SimResult<wgpu::RenderPipeline> {
        if self.kind != ProgramKind::Render {
            return Err(SimError::link(&self.label, "not a render program"));
        }
        self.check_vertex_inputs(array)?;

        let vertex = self.stage(StageKind::Vertex)?;
        let fragment = self.stage(StageKind::Fragment)?;
        let buffers = array.vertex_layouts();

        scoped(device, |e| SimError::link(&self.label, e), || {
            let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(format!("{} layout", self.label).as_str()),
                bind_group_layouts,
                immediate_size: 0,
            });

            Ok(device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(self.label.as_str()),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &vertex.module,
                    entry_point: Some(vertex.entry_point.as_str()),
                    compilation_options: Default::default(),
                    buffers: &buffers,
                },
                fragment: Some(wgpu::FragmentState {
                    module: &fragment.module,
                    entry_point: Some(fragment.entry_point.as_str()),
                    compilation_options: Default::default(),
                    targets: &[Some(target)],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            }))
        })
    }

    /// Builds the compute pipeline for an update program.
    pub fn update_pipeline(
        &self,
        device: &wgpu::Device,
        bind_group_layouts: &[&wgpu::BindGroupLayout],
    ) -> SimResult<wgpu::ComputePipeline> {
        if self.kind != ProgramKind::Update {
            return Err(SimError::link(&self.label, "not an update program"));
        }
        let compute = self.stage(StageKind::Compute)?;

        scoped(device, |e| SimError::link(&self.label, e), || {
            let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(format!("{} layout", self.label).as_str()),
                bind_group_layouts,
                immediate_size: 0,
            });

            Ok(device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(self.label.as_str()),
                layout: Some(&layout),
                module: &compute.module,
                entry_point: Some(compute.entry_point.as_str()),
                compilation_options: Default::default(),
                cache: None,
            }))
        })
    }
}

/// Compiles stages and links them into a [`Program`].
pub struct ProgramBuilder<'a> {
    device: &'a wgpu::Device,
}

impl<'a> ProgramBuilder<'a> {
    pub fn new(device: &'a wgpu::Device) -> Self {
        Self { device }
    }

    /// Compiles each stage, then links them.
    ///
    /// With `captured_outputs` the program must be an update program whose
    /// capture record declares exactly those names, in that order.
    pub fn compile_program(
        &self,
        label: &str,
        stages: &[StageSource],
        captured_outputs: Option<&[&str]>,
    ) -> SimResult<Program> {
        let checked = stages
            .iter()
            .map(reflect::check_stage)
            .collect::<SimResult<Vec<_>>>()?;

        let interface = reflect::link_interface(label, &checked, captured_outputs)?;
        let kind = if checked.iter().any(|s| s.source.kind == StageKind::Compute) {
            ProgramKind::Update
        } else {
            ProgramKind::Render
        };

        let stages = checked
            .into_iter()
            .map(|stage| {
                let name = stage.source.name;
                let module = scoped(
                    self.device,
                    |diagnostic| SimError::ShaderCompile {
                        stage: name.clone(),
                        diagnostic,
                    },
                    || {
                        Ok(self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
                            label: Some(name.as_str()),
                            source: wgpu::ShaderSource::Wgsl(Cow::Owned(stage.source.source)),
                        }))
                    },
                )?;
                Ok(CompiledStage {
                    kind: stage.source.kind,
                    entry_point: stage.source.entry_point,
                    module,
                })
            })
            .collect::<SimResult<Vec<_>>>()?;

        log::debug!(
            "linked {kind:?} program \"{label}\" ({} inputs, capture: {:?})",
            interface.inputs.len(),
            interface.capture.as_ref().map(|c| c.fields.len()),
        );

        Ok(Program {
            label: label.to_string(),
            kind,
            stages,
            interface,
        })
    }
}
