//! Multi-stage build description as plain values
//!
//! A [`Pipeline`] is an ordered list of [`Stage`]s plus a cursor naming the stage
//! the next one derives from. Appending returns a new pipeline; nothing edits a
//! stage once it is part of one. [`Pipeline::render`] produces Dockerfile text.

use crate::error::ComposeError;
use std::fmt;

/// Bind mount of a named build context, attached to a `RUN` instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindMount {
    /// Name passed to the engine with `--build-context <name>=<dir>`
    pub from: String,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    User(String),
    Workdir(String),
    Env {
        key: String,
        value: String,
    },
    Copy {
        sources: Vec<String>,
        dest: String,
        from: Option<String>,
        chown: Option<String>,
    },
    Run {
        command: String,
        mount: Option<BindMount>,
    },
    /// Exec-form entrypoint command
    Cmd(Vec<String>),
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::User(user) => write!(f, "USER {}", user),
            Instruction::Workdir(dir) => write!(f, "WORKDIR {}", dir),
            Instruction::Env { key, value } => write!(f, "ENV {}={}", key, quote(value)),
            Instruction::Copy {
                sources,
                dest,
                from,
                chown,
            } => {
                write!(f, "COPY")?;
                if let Some(from) = from {
                    write!(f, " --from={}", from)?;
                }
                if let Some(chown) = chown {
                    write!(f, " --chown={}", chown)?;
                }
                write!(f, " {} {}", sources.join(" "), dest)
            }
            Instruction::Run { command, mount } => {
                write!(f, "RUN")?;
                if let Some(mount) = mount {
                    write!(
                        f,
                        " --mount=type=bind,from={},target={}",
                        mount.from, mount.target
                    )?;
                }
                write!(f, " {}", command)
            }
            Instruction::Cmd(argv) => {
                let items: Vec<String> = argv.iter().map(|a| quote(a)).collect();
                write!(f, "CMD [{}]", items.join(", "))
            }
        }
    }
}

/// Double-quoted, JSON-compatible string literal
fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    name: String,
    base: String,
    /// Detached stages do not move the pipeline cursor
    detached: bool,
    instructions: Vec<Instruction>,
}

impl Stage {
    pub fn new(name: impl Into<String>, base: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base: base.into(),
            detached: false,
            instructions: Vec::new(),
        }
    }

    /// Side stage (e.g. a scratch export) that later stages never derive from
    pub fn detached(name: impl Into<String>, base: impl Into<String>) -> Self {
        Self {
            detached: true,
            ..Self::new(name, base)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn is_detached(&self) -> bool {
        self.detached
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn instruction(mut self, instruction: Instruction) -> Self {
        self.instructions.push(instruction);
        self
    }

    pub fn user(self, user: impl Into<String>) -> Self {
        self.instruction(Instruction::User(user.into()))
    }

    pub fn workdir(self, dir: impl Into<String>) -> Self {
        self.instruction(Instruction::Workdir(dir.into()))
    }

    pub fn env(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.instruction(Instruction::Env {
            key: key.into(),
            value: value.into(),
        })
    }

    pub fn copy(self, sources: Vec<String>, dest: impl Into<String>, chown: Option<&str>) -> Self {
        self.instruction(Instruction::Copy {
            sources,
            dest: dest.into(),
            from: None,
            chown: chown.map(str::to_string),
        })
    }

    pub fn copy_from(
        self,
        stage: impl Into<String>,
        source: impl Into<String>,
        dest: impl Into<String>,
        chown: Option<&str>,
    ) -> Self {
        self.instruction(Instruction::Copy {
            sources: vec![source.into()],
            dest: dest.into(),
            from: Some(stage.into()),
            chown: chown.map(str::to_string),
        })
    }

    pub fn run(self, command: impl Into<String>) -> Self {
        self.instruction(Instruction::Run {
            command: command.into(),
            mount: None,
        })
    }

    pub fn run_with_mount(self, command: impl Into<String>, mount: BindMount) -> Self {
        self.instruction(Instruction::Run {
            command: command.into(),
            mount: Some(mount),
        })
    }

    pub fn cmd(self, argv: Vec<String>) -> Self {
        self.instruction(Instruction::Cmd(argv))
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "FROM {} AS {}", self.base, self.name)?;
        for instruction in &self.instructions {
            writeln!(f, "{}", instruction)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pipeline {
    stages: Vec<Stage>,
    last_stage: Option<String>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pipeline holding a single `base` stage from `image`, switched to `user`
    pub fn seeded(image: &str, user: &str) -> Self {
        Self {
            stages: vec![Stage::new("base", image).user(user)],
            last_stage: Some("base".to_string()),
        }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn get(&self, name: &str) -> Option<&Stage> {
        self.stages.iter().find(|stage| stage.name == name)
    }

    /// Name of the stage the next derived stage builds on
    pub fn last_stage(&self) -> Option<&str> {
        self.last_stage.as_deref()
    }

    /// Empty stage named `name` whose base is the current last stage
    pub fn stage_from_last(&self, name: impl Into<String>) -> Result<Stage, ComposeError> {
        let name = name.into();
        match &self.last_stage {
            Some(last) => Ok(Stage::new(name, last.clone())),
            None => Err(ComposeError::EmptyPipeline(name)),
        }
    }

    /// New pipeline with `stage` appended. Non-detached stages become the last stage.
    pub fn with_stage(&self, stage: Stage) -> Result<Pipeline, ComposeError> {
        if self.get(&stage.name).is_some() {
            return Err(ComposeError::DuplicateStage(stage.name));
        }

        let mut next = self.clone();
        if !stage.detached {
            next.last_stage = Some(stage.name.clone());
        }
        next.stages.push(stage);
        Ok(next)
    }

    pub fn render(&self) -> String {
        self.stages
            .iter()
            .map(Stage::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
