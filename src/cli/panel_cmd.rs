//! Panel commands: show, get, set and type
//!
//! Each command loads the diagram into an in-memory host, announces the
//! import to a fresh [`Panel`] and selects one element, the same way an
//! editor would drive the panel.

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};

use super::output::Output;
use crate::domain::{ElementId, PanelConfig};
use crate::host::InMemoryDiagram;
use crate::panel::{FieldInput, Panel, PanelView};
use crate::storage::{load_panel_config, Config, DiagramStore, Project};

/// Where the panel configuration and diagram come from
///
/// Explicit paths win over the project settings.
#[derive(Debug, Default)]
pub struct Sources {
    pub config: Option<PathBuf>,
    pub diagram: Option<PathBuf>,
}

impl Sources {
    /// The project enclosing the current directory, if any
    fn project(&self) -> Result<Option<Project>> {
        let current = std::env::current_dir().context("Failed to read current directory")?;
        Config::find_project_root(&current)
            .map(Project::open)
            .transpose()
    }

    /// Loads the panel configuration
    pub fn panel_config(&self, output: &Output) -> Result<PanelConfig> {
        let config = match (&self.config, self.project()?) {
            (Some(path), _) => {
                output.verbose_ctx("config", &format!("Using {}", path.display()));
                load_panel_config(path)?
            }
            (None, Some(project)) => {
                output.verbose_ctx("config", &format!("Using project at {}", project.root().display()));
                project.panel_config()?
            }
            (None, None) => {
                output.verbose_ctx("config", "Using built-in configuration");
                PanelConfig::builtin().context("Failed to load built-in panel config")?
            }
        };

        for warning in config.warnings() {
            output.verbose_ctx("config", &format!("Warning: {}", warning));
        }
        Ok(config)
    }

    /// Store of the diagram to edit and whether to pretty-print it
    fn diagram_store(&self) -> Result<(DiagramStore, bool)> {
        let project = self.project()?;
        let pretty = project
            .as_ref()
            .map_or(true, |project| project.config().project.pretty);

        let store = match (&self.diagram, &project) {
            (Some(path), _) => DiagramStore::new(path),
            (None, Some(project)) => project.diagram_store()?,
            (None, None) => bail!("No diagram given. Pass --diagram or run 'bpmn-panel init' first."),
        };
        Ok((store, pretty))
    }
}

/// A diagram opened in the panel
struct Session {
    diagram: InMemoryDiagram,
    panel: Panel,
    store: DiagramStore,
    pretty: bool,
}

impl Session {
    fn open(output: &Output, sources: &Sources) -> Result<Self> {
        let config = sources.panel_config(output)?;
        let (store, pretty) = sources.diagram_store()?;
        output.verbose_ctx("diagram", &format!("Loading {}", store.path().display()));

        let document = store.load()?;
        let mut diagram = InMemoryDiagram::default();
        let mut panel = Panel::new(config);
        diagram.import(document, &mut panel);

        Ok(Self {
            diagram,
            panel,
            store,
            pretty,
        })
    }

    /// Opens the diagram and selects one element
    fn select(output: &Output, sources: &Sources, element: &str) -> Result<Self> {
        let mut session = Self::open(output, sources)?;
        let id = ElementId::new(element);
        if session.diagram.element(&id).is_none() {
            bail!("Element not found: {}", element);
        }

        session.diagram.select(vec![id], &mut session.panel);
        Ok(session)
    }

    fn view(&self) -> Result<&PanelView> {
        self.panel
            .view()
            .ok_or_else(|| anyhow!("Nothing to show for the selected element"))
    }

    fn save(&self) -> Result<()> {
        self.store.save(&self.diagram.to_document(), self.pretty)
    }
}

/// Renders the panel of an element
pub fn show(output: &Output, sources: &Sources, element: &str) -> Result<()> {
    let session = Session::select(output, sources, element)?;
    let view = session.view()?;

    if output.is_json() {
        output.data(view);
    } else {
        println!("{}", view);
    }

    Ok(())
}

/// Prints one field value
pub fn get(output: &Output, sources: &Sources, element: &str, field: &str) -> Result<()> {
    let session = Session::select(output, sources, element)?;
    let view = session.view()?;
    let field_view = view
        .field(field)
        .ok_or_else(|| anyhow!("Field '{}' is not shown for {}", field, element))?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "element": element,
            "field": field,
            "value": field_view.value,
        }));
    } else {
        println!("{}", field_view.value);
    }

    Ok(())
}

/// Edits fields and saves the diagram
pub fn set(output: &Output, sources: &Sources, element: &str, assignments: &[(String, String)]) -> Result<()> {
    let mut session = Session::select(output, sources, element)?;

    for (field, raw) in assignments {
        let descriptor = session
            .panel
            .field_descriptor(&session.diagram, field)
            .ok_or_else(|| anyhow!("Field '{}' is not shown for {}", field, element))?;
        if descriptor.readonly {
            bail!("Field '{}' is read-only", field);
        }

        let input = FieldInput::parse(descriptor.kind, raw)
            .with_context(|| format!("Invalid value for '{}'", field))?;
        session.panel.input(&session.diagram, field, input);
        output.verbose_ctx("set", &format!("Staged {}={:?}", field, raw));
    }

    let notice = session.panel.save(&mut session.diagram);
    output.verbose_ctx("set", &format!("{} model update(s)", session.diagram.revision()));

    if session.diagram.revision() > 0 {
        session.save()?;
    }

    match notice {
        Some(notice) if notice.is_error() => bail!("{}", notice.message),
        Some(notice) => output.notice(&notice),
        None => output.success("Nothing to save"),
    }

    Ok(())
}

/// Prints the subtype of an element, or switches it
pub fn subtype(output: &Output, sources: &Sources, element: &str, target: Option<&str>) -> Result<()> {
    let mut session = Session::select(output, sources, element)?;
    let options: Vec<String> = session
        .view()?
        .type_selector()
        .map(|selector| selector.options.clone())
        .unwrap_or_default();

    let Some(target) = target else {
        let selected = session.panel.selected_subtype();
        if output.is_json() {
            output.data(&serde_json::json!({
                "element": element,
                "subtype": selected,
                "options": options,
            }));
        } else {
            println!("{}", selected.unwrap_or("-"));
            output.verbose_ctx("type", &format!("Available: {}", options.join(", ")));
        }
        return Ok(());
    };

    if options.is_empty() {
        bail!("Element {} has no subtypes", element);
    }
    if !options.iter().any(|option| option == target) {
        bail!(
            "Unknown subtype '{}' for {}. Available: {}",
            target,
            element,
            options.join(", ")
        );
    }

    session
        .panel
        .switch_subtype(&mut session.diagram, target)
        .with_context(|| format!("Failed to switch {} to {}", element, target))?;

    if session.diagram.revision() > 0 {
        session.save()?;
    }

    output.success(&format!("Switched {} to {}", element, target));
    Ok(())
}
