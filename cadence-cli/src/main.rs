// Copyright 2025 Cadence Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Cadence CLI
//!
//! Drives carousels over a headless document from the command line.

use anyhow::{anyhow, bail, Context, Result};
use cadence_core::{
    Carousel, CarouselConfig, Document, HookKind, IndexContext, InstanceId, RegisteredHook,
    RelationKind,
};
use clap::{Parser, Subcommand};
use parking_lot::Mutex;
use serde::Serialize;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "cadence")]
#[command(about = "Cadence - cyclic index engine", long_about = None)]
struct Cli {
    /// Verbose mode
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single carousel through a script
    Run {
        /// Configuration file (.json or .toml)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Bind to a headless document with this many children
        #[arg(long)]
        children: Option<usize>,

        /// Comma-separated steps: play, pause, next, prev, jump:I, wait:MS,
        /// interval:MS, force, release
        #[arg(long, default_value = "")]
        script: String,

        /// Time to keep running after the script, in milliseconds
        #[arg(long, default_value = "0")]
        duration_ms: u64,

        /// Output as JSON (machine-readable)
        #[arg(long)]
        json: bool,
    },

    /// Relate a follower to a leader and step the leader
    Relate {
        /// Number of leader children
        #[arg(long, default_value = "6")]
        leader_children: usize,

        /// Relation type (index or dom)
        #[arg(long, default_value = "index")]
        kind: String,

        /// Number of leader steps
        #[arg(long, default_value = "8")]
        steps: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Play,
    Pause,
    Next,
    Prev,
    Jump(usize),
    Wait(u64),
    Interval(u64),
    Force,
    Release,
}

impl FromStr for Step {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (name, arg) = match s.split_once(':') {
            Some((name, arg)) => (name, Some(arg)),
            None => (s, None),
        };
        let number = |arg: Option<&str>| -> Result<u64> {
            let arg = arg.ok_or_else(|| anyhow!("Step '{}' needs an argument", name))?;
            arg.parse()
                .with_context(|| format!("Invalid argument for '{}': {}", name, arg))
        };

        let step = match name {
            "play" => Step::Play,
            "pause" => Step::Pause,
            "next" => Step::Next,
            "prev" => Step::Prev,
            "force" => Step::Force,
            "release" => Step::Release,
            "jump" => Step::Jump(number(arg)? as usize),
            "wait" => Step::Wait(number(arg)?),
            "interval" => Step::Interval(number(arg)?),
            other => bail!("Unknown step: {}", other),
        };
        Ok(step)
    }
}

fn parse_script(script: &str) -> Result<Vec<Step>> {
    script
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(Step::from_str)
        .collect()
}

fn apply(carousel: &Carousel, step: Step) {
    match step {
        Step::Play => carousel.play(),
        Step::Pause => carousel.pause(),
        Step::Next => carousel.next(),
        Step::Prev => carousel.prev(),
        Step::Jump(index) => carousel.jump_to_index(index),
        Step::Wait(ms) => carousel.wait(ms),
        Step::Interval(ms) => carousel.update_interval_time(ms),
        Step::Force => carousel.pause_force(),
        Step::Release => carousel.pause_force_off(),
    };
}

/// Record every index the carousel moves to.
fn track(carousel: &Carousel, label: &'static str) -> Arc<Mutex<Vec<usize>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    carousel.add_hook(
        HookKind::OnIndexChange,
        RegisteredHook::observe(move |c: &Carousel| {
            let ctx = c.context();
            info!(carousel = label, index = ctx.curr_index, direction = %ctx.last_direction, "Index changed");
            sink.lock().push(ctx.curr_index);
        }),
    );
    seen
}

/// A document with one `.block` holding `count` `.slide` children.
fn slide_document(count: usize) -> Result<Arc<Document>> {
    let doc = Document::new();
    let block = doc.append_element(doc.root(), "div", &["block"])?;
    for _ in 0..count {
        doc.append_element(block, "div", &["slide"])?;
    }
    Ok(doc)
}

#[derive(Serialize)]
struct RunReport {
    instance: InstanceId,
    context: IndexContext,
    changes: Vec<usize>,
}

async fn run(
    config: Option<PathBuf>,
    children: Option<usize>,
    script: &str,
    duration_ms: u64,
    json: bool,
) -> Result<()> {
    let steps = parse_script(script)?;
    let mut config = match config {
        Some(path) => CarouselConfig::from_path(&path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => CarouselConfig::default(),
    };

    let mut builder = Carousel::builder();
    if let Some(count) = children {
        if config.dom.selectors.children.is_empty() {
            config.dom.selectors.children = ".block .slide".to_string();
        }
        builder = builder.with_document(slide_document(count)?);
    }
    let carousel = builder.with_config(config).build()?;

    let changes = track(&carousel, "main");
    carousel.init();
    for step in steps {
        apply(&carousel, step);
    }
    carousel.settled().await;

    if duration_ms > 0 {
        tokio::time::sleep(Duration::from_millis(duration_ms)).await;
    }
    carousel.pause();
    carousel.settled().await;

    let report = RunReport {
        instance: carousel.id(),
        context: carousel.context(),
        changes: changes.lock().clone(),
    };
    carousel.destroy();
    carousel.settled().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let ctx = &report.context;
        println!("Carousel {}", report.instance);
        println!("  Range: {}..={}", ctx.min_index, ctx.max_index);
        println!("  Index: {} (previous {})", ctx.curr_index, ctx.prev_index);
        println!("  Direction: {}", ctx.last_direction);
        println!("  Changes: {:?}", report.changes);
    }
    Ok(())
}

async fn relate(leader_children: usize, kind: &str, steps: usize) -> Result<()> {
    if leader_children == 0 {
        bail!("--leader-children must be at least 1");
    }
    let kind: RelationKind = kind.parse()?;

    let (leader, follower) = match kind {
        RelationKind::Index => {
            let mut config = CarouselConfig::default();
            config.range.to = leader_children - 1;
            (Carousel::new(config.clone())?, Carousel::new(config)?)
        }
        RelationKind::Dom => {
            // Follower children are groups of two leader children.
            let doc = Document::new();
            let strip = doc.append_element(doc.root(), "div", &["strip"])?;
            let mut group = None;
            for i in 0..leader_children {
                if i % 2 == 0 {
                    group = Some(doc.append_element(strip, "div", &["group"])?);
                }
                if let Some(group) = group {
                    doc.append_element(group, "div", &["slide"])?;
                }
            }

            let mut leader_config = CarouselConfig::default();
            leader_config.dom.selectors.children = ".slide".to_string();
            let mut follower_config = CarouselConfig::default();
            follower_config.dom.selectors.children = ".group".to_string();
            (
                Carousel::builder()
                    .with_config(leader_config)
                    .with_document(doc.clone())
                    .build()?,
                Carousel::builder()
                    .with_config(follower_config)
                    .with_document(doc)
                    .build()?,
            )
        }
    };

    let leader_seen = track(&leader, "leader");
    let follower_seen = track(&follower, "follower");
    follower.init().set_relation_to(&leader, kind);
    leader.init();
    for _ in 0..steps {
        leader.next();
    }
    leader.settled().await;

    println!("Relation: {}", kind);
    println!("  Leader:   {:?}", *leader_seen.lock());
    println!("  Follower: {:?}", *follower_seen.lock());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    match cli.command {
        Commands::Run {
            config,
            children,
            script,
            duration_ms,
            json,
        } => run(config, children, &script, duration_ms, json).await,
        Commands::Relate {
            leader_children,
            kind,
            steps,
        } => relate(leader_children, &kind, steps).await,
    }
}
