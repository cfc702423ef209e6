//! Prompt template loading and rendering via `minijinja`.
//!
//! Templates are loaded from the filesystem (default: `templates/`
//! directory) so the story voice can be tuned without recompiling. Every
//! request is a system message plus one user message; the system template
//! receives the speaking persona, the user templates receive the cycle data.

use std::path::Path;

use gamemaster_types::{ContentKind, CycleSnapshot, NpcDialogue, NpcProfile};
use minijinja::Environment;
use serde_json::json;

use crate::error::RunnerError;

/// Template files the engine requires, by registered name.
pub const TEMPLATE_NAMES: [&str; 5] = ["system", "episode", "dialogue", "outcome", "teaser"];

/// Manages prompt template loading and rendering.
///
/// Templates can be edited on disk and will be picked up on the next call
/// to [`PromptEngine::new`].
pub struct PromptEngine {
    env: Environment<'static>,
}

/// The complete rendered prompt ready to send to an LLM backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPrompt {
    /// System message establishing the speaker.
    pub system: String,
    /// User message carrying the request.
    pub user: String,
}

impl PromptEngine {
    /// Create a new prompt engine loading templates from the given directory.
    ///
    /// The directory must contain `system.j2`, `episode.j2`, `dialogue.j2`,
    /// `outcome.j2`, and `teaser.j2`.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Template`] if a file is missing or does not
    /// compile.
    pub fn new(templates_dir: &Path) -> Result<Self, RunnerError> {
        let mut env = Environment::new();
        for name in TEMPLATE_NAMES {
            let source = load_template(templates_dir, name)?;
            env.add_template_owned(name, source)
                .map_err(|e| RunnerError::Template(format!("failed to add {name} template: {e}")))?;
        }
        Ok(Self { env })
    }

    /// Prompt for the day's episode.
    pub fn episode(&self, day: u64, prior_summary: &str) -> Result<RenderedPrompt, RunnerError> {
        Ok(RenderedPrompt {
            system: self.render("system", &json!({ "npc": null }))?,
            user: self.render(
                "episode",
                &json!({ "day": day, "prior_summary": prior_summary }),
            )?,
        })
    }

    /// Prompt for one NPC's reaction to the story.
    pub fn dialogue(&self, npc: &NpcProfile, story: &str) -> Result<RenderedPrompt, RunnerError> {
        let ctx = json!({ "npc": npc, "story": story });
        Ok(RenderedPrompt {
            system: self.render("system", &ctx)?,
            user: self.render("dialogue", &ctx)?,
        })
    }

    /// Prompt for the outcome and the four content prompts.
    pub fn outcome(
        &self,
        story: &str,
        dialogues: &[NpcDialogue],
        decisions: &[String],
    ) -> Result<RenderedPrompt, RunnerError> {
        let kinds: Vec<serde_json::Value> = ContentKind::ALL
            .into_iter()
            .map(|kind| json!({ "key": kind.as_str(), "tool": kind.tool_family() }))
            .collect();
        Ok(RenderedPrompt {
            system: self.render("system", &json!({ "npc": null }))?,
            user: self.render(
                "outcome",
                &json!({
                    "story": story,
                    "dialogues": dialogues,
                    "decisions": decisions,
                    "content_kinds": kinds,
                }),
            )?,
        })
    }

    /// Prompt for tomorrow's teaser.
    pub fn teaser(&self, snapshot: &CycleSnapshot) -> Result<RenderedPrompt, RunnerError> {
        Ok(RenderedPrompt {
            system: self.render("system", &json!({ "npc": null }))?,
            user: self.render("teaser", &serde_json::to_value(snapshot)?)?,
        })
    }

    fn render(&self, name: &str, ctx: &serde_json::Value) -> Result<String, RunnerError> {
        self.env
            .get_template(name)
            .map_err(|e| RunnerError::Template(format!("missing {name} template: {e}")))?
            .render(ctx)
            .map_err(|e| RunnerError::Template(format!("{name} render failed: {e}")))
    }
}

impl core::fmt::Debug for PromptEngine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PromptEngine")
            .field("templates", &TEMPLATE_NAMES)
            .finish()
    }
}

/// Read a template file from disk.
fn load_template(dir: &Path, name: &str) -> Result<String, RunnerError> {
    let path = dir.join(format!("{name}.j2"));
    std::fs::read_to_string(&path)
        .map_err(|e| RunnerError::Template(format!("failed to read {}: {e}", path.display())))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use gamemaster_types::default_cast;

    use super::*;

    fn scratch_dir(tag: &str) -> std::path::PathBuf {
        let unique = format!(
            "gamemaster_{tag}_{}_{:?}",
            std::process::id(),
            std::thread::current().id(),
        );
        let dir = std::env::temp_dir().join(unique);
        std::fs::create_dir_all(&dir).ok();
        dir
    }

    fn write_test_templates(dir: &Path) {
        std::fs::write(
            dir.join("system.j2"),
            "{% if npc %}You are {{ npc.name }}. {{ npc.directive }}{% else %}You are the Game Master.{% endif %}",
        )
        .ok();
        std::fs::write(
            dir.join("episode.j2"),
            "Day {{ day }}. Previously: {% if prior_summary %}{{ prior_summary }}{% else %}nothing yet{% endif %}",
        )
        .ok();
        std::fs::write(dir.join("dialogue.j2"), "Context: {{ story }}").ok();
        std::fs::write(
            dir.join("outcome.j2"),
            "{% for d in decisions %}- {{ d }}\n{% endfor %}{% for k in content_kinds %}{{ k.key }}={{ k.tool }};{% endfor %}",
        )
        .ok();
        std::fs::write(
            dir.join("teaser.j2"),
            "Day {{ day }}: {{ outcome }} ({{ player_decisions | length }} decisions)",
        )
        .ok();
    }

    #[test]
    fn renders_every_prompt() {
        let dir = scratch_dir("templates");
        write_test_templates(&dir);
        let engine = PromptEngine::new(&dir).unwrap();

        let episode = engine.episode(3, "").unwrap();
        assert_eq!(episode.system, "You are the Game Master.");
        assert_eq!(episode.user, "Day 3. Previously: nothing yet");

        let cast = default_cast();
        let captain = cast.first().unwrap();
        let dialogue = engine.dialogue(captain, "A signal.").unwrap();
        assert!(dialogue.system.starts_with("You are Captain Eva Rodriguez."));
        assert_eq!(dialogue.user, "Context: A signal.");

        let outcome = engine
            .outcome("story", &[], &["Hail them".to_owned()])
            .unwrap();
        assert!(outcome.user.contains("- Hail them"));
        assert!(outcome.user.contains("3d_scene=trellis;"));

        let snapshot = CycleSnapshot {
            day: 3,
            story: "story".to_owned(),
            npc_dialogues: Vec::new(),
            player_decisions: vec!["a".to_owned(), "b".to_owned()],
            outcome: "The crew escapes.".to_owned(),
            content_prompts: BTreeMap::new(),
        };
        let teaser = engine.teaser(&snapshot).unwrap();
        assert_eq!(teaser.user, "Day 3: The crew escapes. (2 decisions)");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_template_returns_error() {
        let dir = scratch_dir("missing_templates");
        std::fs::write(dir.join("system.j2"), "test").ok();

        let result = PromptEngine::new(&dir);
        assert!(matches!(result, Err(RunnerError::Template(_))));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn project_templates_load() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("templates");
        if dir.exists() {
            let engine = PromptEngine::new(&dir);
            assert!(engine.is_ok(), "project templates failed to load");
            let engine = engine.unwrap();
            assert!(engine.episode(1, "").is_ok());
            let cast = default_cast();
            assert!(engine.dialogue(cast.first().unwrap(), "story").is_ok());
            assert!(engine.outcome("story", &[], &[]).is_ok());
        }
    }
}
