//! Front-end checks and interface reflection over WGSL stages.
//!
//! Everything here runs on the CPU through `naga`, so compile and link
//! diagnostics are produced before any device object exists.

use crate::error::{SimError, SimResult};
use crate::layout::{BufferLayout, ScalarType};

use super::{StageKind, StageSource};

/// Resource slot of the particle record a compute stage reads.
pub const INPUT_RECORD_BINDING: (u32, u32) = (0, 0);

/// Resource slot of the record a compute stage captures into.
pub const CAPTURE_RECORD_BINDING: (u32, u32) = (1, 0);

/// A named value crossing a stage boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceVar {
    pub name: String,
    pub location: u32,
    pub components: u32,
    pub scalar: ScalarType,
}

/// One field of a packed storage record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordField {
    pub name: String,
    pub components: u32,
    pub scalar: ScalarType,
    pub offset: u64,
}

/// Byte layout of a storage record as the shader sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLayout {
    pub stride: u64,
    pub fields: Vec<RecordField>,
}

impl RecordLayout {
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Checks that a buffer layout packs data exactly like this record.
    ///
    /// Fields are compared by position; names may differ between the read
    /// record (`i_*`) and the captured one (`v_*`).
    pub fn check_matches(&self, layout: &BufferLayout) -> Result<(), String> {
        if layout.stride != self.stride {
            return Err(format!(
                "buffer stride {} differs from record stride {}",
                layout.stride, self.stride
            ));
        }
        if layout.pointers.len() != self.fields.len() {
            return Err(format!(
                "buffer declares {} attributes, record has {} fields",
                layout.pointers.len(),
                self.fields.len()
            ));
        }
        for (ptr, field) in layout.pointers.iter().zip(&self.fields) {
            if ptr.offset != field.offset
                || ptr.components != field.components
                || ptr.scalar != field.scalar
            {
                return Err(format!(
                    "`{}` ({}x{:?} @ {}) does not match record field `{}` ({}x{:?} @ {})",
                    ptr.name,
                    ptr.components,
                    ptr.scalar,
                    ptr.offset,
                    field.name,
                    field.components,
                    field.scalar,
                    field.offset,
                ));
            }
        }
        Ok(())
    }
}

/// A stage that passed parsing and validation.
pub(crate) struct CheckedStage {
    pub source: StageSource,
    pub module: naga::Module,
}

/// Reflected interface of a linked program.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgramInterface {
    /// Inputs of the first stage, addressable by name.
    pub inputs: Vec<InterfaceVar>,
    /// Record read by an update stage.
    pub input_record: Option<RecordLayout>,
    /// Record written by an update stage.
    pub capture: Option<RecordLayout>,
}

/// Parses and validates one stage; failures carry naga's report verbatim.
pub(crate) fn check_stage(stage: &StageSource) -> SimResult<CheckedStage> {
    let compile_err = |diagnostic: String| SimError::ShaderCompile {
        stage: stage.name.clone(),
        diagnostic,
    };

    let module = naga::front::wgsl::parse_str(&stage.source)
        .map_err(|e| compile_err(e.emit_to_string(&stage.source)))?;

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    );
    validator
        .validate(&module)
        .map_err(|e| compile_err(e.emit_to_string(&stage.source)))?;

    let has_entry = module
        .entry_points
        .iter()
        .any(|ep| ep.name == stage.entry_point && ep.stage == stage.kind.naga_stage());
    if !has_entry {
        return Err(compile_err(format!(
            "no {:?} entry point named `{}`",
            stage.kind, stage.entry_point
        )));
    }

    Ok(CheckedStage {
        source: stage.clone(),
        module,
    })
}

/// Checks stage interfaces against each other and the capture declaration.
pub(crate) fn link_interface(
    program: &str,
    stages: &[CheckedStage],
    captured_outputs: Option<&[&str]>,
) -> SimResult<ProgramInterface> {
    let find = |kind: StageKind| stages.iter().filter(move |s| s.source.kind == kind);
    let count = |kind: StageKind| find(kind).count();

    match (count(StageKind::Vertex), count(StageKind::Fragment), count(StageKind::Compute)) {
        (1, 1, 0) => {
            if captured_outputs.is_some() {
                return Err(SimError::link(
                    program,
                    "captured outputs require an update (compute) stage",
                ));
            }
            let vertex = find(StageKind::Vertex).next().ok_or_else(|| missing(program))?;
            let fragment = find(StageKind::Fragment).next().ok_or_else(|| missing(program))?;
            link_render(program, vertex, fragment)
        }
        (0, 0, 1) => {
            let compute = find(StageKind::Compute).next().ok_or_else(|| missing(program))?;
            link_update(program, compute, captured_outputs)
        }
        (v, f, c) => Err(SimError::link(
            program,
            format!(
                "expected one vertex + one fragment stage or a single compute stage, \
                 got {v} vertex, {f} fragment, {c} compute"
            ),
        )),
    }
}

fn missing(program: &str) -> SimError {
    SimError::link(program, "stage disappeared during linking")
}

fn link_render(
    program: &str,
    vertex: &CheckedStage,
    fragment: &CheckedStage,
) -> SimResult<ProgramInterface> {
    let inputs = entry_inputs(vertex);
    let varyings = entry_outputs(vertex);
    let frag_inputs = entry_inputs(fragment);

    for input in &frag_inputs {
        let Some(out) = varyings.iter().find(|o| o.location == input.location) else {
            return Err(SimError::link(
                program,
                format!(
                    "fragment input `{}` at location {} is not written by the vertex stage",
                    input.name, input.location
                ),
            ));
        };
        if out.components != input.components || out.scalar != input.scalar {
            return Err(SimError::link(
                program,
                format!(
                    "varying at location {} is {}x{:?} in the vertex stage but {}x{:?} in the fragment stage",
                    input.location, out.components, out.scalar, input.components, input.scalar
                ),
            ));
        }
    }

    Ok(ProgramInterface {
        inputs,
        input_record: None,
        capture: None,
    })
}

fn link_update(
    program: &str,
    compute: &CheckedStage,
    captured_outputs: Option<&[&str]>,
) -> SimResult<ProgramInterface> {
    let module = &compute.module;

    let input_record = storage_record(module, INPUT_RECORD_BINDING).ok_or_else(|| {
        SimError::link(
            program,
            format!(
                "no particle record bound at @group({}) @binding({})",
                INPUT_RECORD_BINDING.0, INPUT_RECORD_BINDING.1
            ),
        )
    })?;

    let capture = match captured_outputs {
        None => None,
        Some(names) => {
            let record = storage_record(module, CAPTURE_RECORD_BINDING)
                .filter(|r| r.writable)
                .ok_or_else(|| {
                    SimError::link(
                        program,
                        format!(
                            "no writable capture record bound at @group({}) @binding({})",
                            CAPTURE_RECORD_BINDING.0, CAPTURE_RECORD_BINDING.1
                        ),
                    )
                })?;
            let declared: Vec<&str> = record.layout.field_names().collect();
            if declared != names {
                return Err(SimError::link(
                    program,
                    format!("captured outputs {names:?} do not match the capture record {declared:?}"),
                ));
            }
            Some(record.layout)
        }
    };

    let inputs = input_record
        .layout
        .fields
        .iter()
        .enumerate()
        .map(|(i, f)| InterfaceVar {
            name: f.name.clone(),
            location: i as u32,
            components: f.components,
            scalar: f.scalar,
        })
        .collect();

    Ok(ProgramInterface {
        inputs,
        input_record: Some(input_record.layout),
        capture,
    })
}

// ── naga helpers ──────────────────────────────────────────────────────────

struct StorageRecord {
    layout: RecordLayout,
    writable: bool,
}

fn entry_point<'m>(stage: &'m CheckedStage) -> Option<&'m naga::EntryPoint> {
    stage
        .module
        .entry_points
        .iter()
        .find(|ep| ep.name == stage.source.entry_point && ep.stage == stage.source.kind.naga_stage())
}

fn entry_inputs(stage: &CheckedStage) -> Vec<InterfaceVar> {
    let mut vars = Vec::new();
    if let Some(ep) = entry_point(stage) {
        for arg in &ep.function.arguments {
            collect_located(&stage.module, arg.name.as_deref(), arg.ty, arg.binding.as_ref(), &mut vars);
        }
    }
    vars.sort_by_key(|v| v.location);
    vars
}

fn entry_outputs(stage: &CheckedStage) -> Vec<InterfaceVar> {
    let mut vars = Vec::new();
    if let Some(result) = entry_point(stage).and_then(|ep| ep.function.result.as_ref()) {
        collect_located(&stage.module, None, result.ty, result.binding.as_ref(), &mut vars);
    }
    vars.sort_by_key(|v| v.location);
    vars
}

/// Collects `@location` values from a binding or from the members of a struct.
fn collect_located(
    module: &naga::Module,
    name: Option<&str>,
    ty: naga::Handle<naga::Type>,
    binding: Option<&naga::Binding>,
    out: &mut Vec<InterfaceVar>,
) {
    match binding {
        Some(naga::Binding::Location { location, .. }) => {
            if let Some((components, scalar)) = shape_of(&module.types[ty].inner) {
                out.push(InterfaceVar {
                    name: name.unwrap_or_default().to_string(),
                    location: *location,
                    components,
                    scalar,
                });
            }
        }
        Some(_) => {} // builtin
        None => {
            if let naga::TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for member in members {
                    collect_located(module, member.name.as_deref(), member.ty, member.binding.as_ref(), out);
                }
            }
        }
    }
}

fn storage_record(module: &naga::Module, (group, binding): (u32, u32)) -> Option<StorageRecord> {
    let var = module.global_variables.iter().map(|(_, v)| v).find(|v| {
        v.binding
            .as_ref()
            .is_some_and(|b| b.group == group && b.binding == binding)
    })?;

    let naga::AddressSpace::Storage { access } = var.space else {
        return None;
    };

    let naga::TypeInner::Array { base, stride, .. } = module.types[var.ty].inner else {
        return None;
    };
    let naga::TypeInner::Struct { members, .. } = &module.types[base].inner else {
        return None;
    };

    let mut fields = Vec::with_capacity(members.len());
    for member in members {
        let (components, scalar) = shape_of(&module.types[member.ty].inner)?;
        fields.push(RecordField {
            name: member.name.clone().unwrap_or_default(),
            components,
            scalar,
            offset: member.offset as u64,
        });
    }

    Some(StorageRecord {
        layout: RecordLayout {
            stride: stride as u64,
            fields,
        },
        writable: access.contains(naga::StorageAccess::STORE),
    })
}

fn shape_of(inner: &naga::TypeInner) -> Option<(u32, ScalarType)> {
    let (components, scalar) = match *inner {
        naga::TypeInner::Scalar(s) => (1, s),
        naga::TypeInner::Vector { size, scalar } => (size as u32, scalar),
        _ => return None,
    };
    if scalar.width != 4 {
        return None;
    }
    let scalar = match scalar.kind {
        naga::ScalarKind::Float => ScalarType::Float32,
        naga::ScalarKind::Sint => ScalarType::Sint32,
        naga::ScalarKind::Uint => ScalarType::Uint32,
        _ => return None,
    };
    Some((components, scalar))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{AttributeDescriptor, AttributeMap};
    use crate::shaders;

    fn checked(name: &str, kind: StageKind, source: &str) -> CheckedStage {
        check_stage(&StageSource::new(name, kind, source.to_string())).unwrap()
    }

    const CAPTURED: &[&str] = &["v_Position", "v_Velocity"];

    // ── compile ───────────────────────────────────────────────────────────

    #[test]
    fn syntax_error_names_the_stage() {
        let stage = StageSource::new("broken.wgsl", StageKind::Vertex, "fn vs_main( {".to_string());
        let Err(SimError::ShaderCompile { stage, diagnostic }) = check_stage(&stage) else {
            panic!("expected a compile error");
        };
        assert_eq!(stage, "broken.wgsl");
        assert!(!diagnostic.is_empty());
    }

    #[test]
    fn type_error_is_a_compile_error() {
        let src = "@compute @workgroup_size(1) fn cs_main() { let x: f32 = 1u; }";
        let stage = StageSource::new("typed.wgsl", StageKind::Compute, src.to_string());
        assert!(matches!(check_stage(&stage), Err(SimError::ShaderCompile { .. })));
    }

    #[test]
    fn missing_entry_point_is_a_compile_error() {
        let src = "@compute @workgroup_size(1) fn main() {}";
        let stage = StageSource::new("entry.wgsl", StageKind::Compute, src.to_string());
        assert!(matches!(check_stage(&stage), Err(SimError::ShaderCompile { .. })));
    }

    // ── builtin sources ───────────────────────────────────────────────────

    #[test]
    fn builtin_update_program_links_with_capture() {
        let src = shaders::ShaderSources::builtin();
        let update = checked(shaders::UPDATE, StageKind::Compute, &src.update);
        let iface = link_interface("update", &[update], Some(CAPTURED)).unwrap();

        let capture = iface.capture.unwrap();
        assert_eq!(capture.stride, 16);
        assert_eq!(capture.field_names().collect::<Vec<_>>(), CAPTURED);
        assert_eq!(capture.fields[1].offset, 8);

        let input = iface.input_record.unwrap();
        assert_eq!(input.field_names().collect::<Vec<_>>(), ["i_Position", "i_Velocity"]);
        assert_eq!(iface.inputs[1].location, 1);
    }

    #[test]
    fn builtin_render_program_links() {
        let src = shaders::ShaderSources::builtin();
        let vs = checked(shaders::RENDER_VERT, StageKind::Vertex, &src.render_vertex);
        let fs = checked(shaders::RENDER_FRAG, StageKind::Fragment, &src.render_fragment);
        let iface = link_interface("render", &[vs, fs], None).unwrap();

        let names: Vec<&str> = iface.inputs.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, ["i_Position", "i_Coord", "i_TexCoord"]);
        assert!(iface.capture.is_none());
    }

    // ── link ──────────────────────────────────────────────────────────────

    #[test]
    fn capture_names_must_match_in_order() {
        let src = shaders::ShaderSources::builtin();
        let update = checked(shaders::UPDATE, StageKind::Compute, &src.update);
        let err = link_interface("update", &[update], Some(&["v_Velocity", "v_Position"]));
        assert!(matches!(err, Err(SimError::ProgramLink { .. })));
    }

    #[test]
    fn capture_on_render_program_is_a_link_error() {
        let src = shaders::ShaderSources::builtin();
        let vs = checked(shaders::RENDER_VERT, StageKind::Vertex, &src.render_vertex);
        let fs = checked(shaders::RENDER_FRAG, StageKind::Fragment, &src.render_fragment);
        let err = link_interface("render", &[vs, fs], Some(CAPTURED));
        assert!(matches!(err, Err(SimError::ProgramLink { .. })));
    }

    #[test]
    fn unmatched_fragment_input_is_a_link_error() {
        let vs = checked(
            "vs.wgsl",
            StageKind::Vertex,
            "struct O { @builtin(position) p: vec4<f32>, @location(0) uv: vec2<f32> }
             @vertex fn vs_main() -> O { var o: O; return o; }",
        );
        let fs = checked(
            "fs.wgsl",
            StageKind::Fragment,
            "@fragment fn fs_main(@location(3) c: vec4<f32>) -> @location(0) vec4<f32> { return c; }",
        );
        let Err(SimError::ProgramLink { diagnostic, .. }) = link_interface("p", &[vs, fs], None) else {
            panic!("expected a link error");
        };
        assert!(diagnostic.contains("location 3"));
    }

    #[test]
    fn varying_shape_mismatch_is_a_link_error() {
        let vs = checked(
            "vs.wgsl",
            StageKind::Vertex,
            "struct O { @builtin(position) p: vec4<f32>, @location(0) uv: vec2<f32> }
             @vertex fn vs_main() -> O { var o: O; return o; }",
        );
        let fs = checked(
            "fs.wgsl",
            StageKind::Fragment,
            "@fragment fn fs_main(@location(0) c: vec4<f32>) -> @location(0) vec4<f32> { return c; }",
        );
        assert!(link_interface("p", &[vs, fs], None).is_err());
    }

    #[test]
    fn lone_vertex_stage_is_a_link_error() {
        let src = shaders::ShaderSources::builtin();
        let vs = checked(shaders::RENDER_VERT, StageKind::Vertex, &src.render_vertex);
        assert!(matches!(
            link_interface("render", &[vs], None),
            Err(SimError::ProgramLink { .. })
        ));
    }

    #[test]
    fn read_only_capture_record_is_rejected() {
        let src = "
            struct P { i_Position: vec2<f32>, i_Velocity: vec2<f32> }
            struct C { v_Position: vec2<f32>, v_Velocity: vec2<f32> }
            @group(0) @binding(0) var<storage, read> src_particles: array<P>;
            @group(1) @binding(0) var<storage, read> dst_particles: array<C>;
            @compute @workgroup_size(64) fn cs_main(@builtin(global_invocation_id) id: vec3<u32>) {
                let p = src_particles[id.x];
                let c = dst_particles[id.x];
            }";
        let update = checked("ro.wgsl", StageKind::Compute, src);
        assert!(link_interface("update", &[update], Some(CAPTURED)).is_err());
    }

    // ── record matching ───────────────────────────────────────────────────

    #[test]
    fn particle_layout_matches_capture_record() {
        let src = shaders::ShaderSources::builtin();
        let update = checked(shaders::UPDATE, StageKind::Compute, &src.update);
        let iface = link_interface("update", &[update], Some(CAPTURED)).unwrap();

        let attrs = AttributeMap::new()
            .with("i_Position", AttributeDescriptor::float(0, 2))
            .with("i_Velocity", AttributeDescriptor::float(1, 2));
        let layout = BufferLayout::resolve("update", 16, &attrs).unwrap();

        assert!(iface.capture.unwrap().check_matches(&layout).is_ok());
        assert!(iface.input_record.unwrap().check_matches(&layout).is_ok());
    }

    #[test]
    fn wrong_stride_does_not_match_record() {
        let record = RecordLayout {
            stride: 16,
            fields: vec![RecordField {
                name: "v_Position".into(),
                components: 2,
                scalar: ScalarType::Float32,
                offset: 0,
            }],
        };
        let attrs = AttributeMap::new().with("i_Position", AttributeDescriptor::float(0, 2));
        let layout = BufferLayout::resolve("update", 8, &attrs).unwrap();
        assert!(record.check_matches(&layout).is_err());
    }
}
