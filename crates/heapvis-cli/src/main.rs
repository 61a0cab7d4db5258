use std::sync::Arc;

use facet::Facet;
use figue as args;
use heapvis_heap::{Demo, HeapProvider};
use heapvis_layout::{Graphviz, LayoutEngine};
use heapvis_runtime::{
    AppState, Collaborators, FileBackend, Handle, Headless, RuntimeConfig, ViewKind,
};
use heapvis_types::ObjectRef;
use tokio::task::JoinHandle;
use tracing::info;

const DEFAULT_OUT: &str = "heapvis.svg";

#[derive(Facet, Debug)]
struct Cli {
    #[facet(flatten)]
    builtins: args::FigueBuiltins,
    #[facet(args::subcommand)]
    command: Command,
}

#[derive(Facet, Debug)]
#[repr(u8)]
enum Command {
    /// Build the sample heap, watch it and export the view.
    Demo {
        #[facet(args::named, default)]
        out: Option<String>,
        #[facet(args::named, default)]
        graph: bool,
        /// Binding whose thunk is forced before the final snapshot.
        #[facet(args::named, default)]
        force: Option<String>,
        #[facet(args::named, default)]
        dot: Option<String>,
    },
    /// Print the sample heap's snapshot and drawing operations as JSON.
    Dump {
        #[facet(args::named, default)]
        label: Option<String>,
        #[facet(args::named, default)]
        depth: Option<u64>,
        #[facet(args::named, default)]
        graph: bool,
        #[facet(args::named, default)]
        dot: Option<String>,
    },
    /// Report whether the layout engine can be run.
    Probe {
        #[facet(args::named, default)]
        dot: Option<String>,
    },
}

#[derive(Facet)]
struct ProbeReport {
    program: String,
    available: bool,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let figue_config = args::builder::<Cli>()
        .map_err(|e| format!("failed to build CLI schema: {e}"))?
        .cli(|cli| cli.strict())
        .help(|h| {
            h.program_name("heapvis")
                .description("Watch the structure of live heap objects")
                .version(option_env!("CARGO_PKG_VERSION").unwrap_or("dev"))
        })
        .build();
    let cli = args::Driver::new(figue_config)
        .run()
        .into_result()
        .map_err(|e| e.to_string())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = RuntimeConfig::from_env()?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to build tokio runtime: {e}"))?;

    match cli.value.command {
        Command::Demo {
            out,
            graph,
            force,
            dot,
        } => {
            override_dot(&mut config, dot);
            runtime.block_on(run_demo(config, out, graph, force))
        }
        Command::Dump {
            label,
            depth,
            graph,
            dot,
        } => {
            override_dot(&mut config, dot);
            if let Some(depth) = depth {
                config.traversal_depth = usize::try_from(depth)
                    .map_err(|_| format!("--depth {depth} is out of range"))?;
            }
            runtime.block_on(run_dump(config, label, graph))
        }
        Command::Probe { dot } => {
            override_dot(&mut config, dot);
            run_probe(&config)
        }
    }
}

fn override_dot(config: &mut RuntimeConfig, dot: Option<String>) {
    if let Some(dot) = dot {
        config.dot_program = dot;
    }
}

/// Starts a headless reactor over the demo heap and registers the binding
/// named `only`, or every binding.
async fn watch(
    config: RuntimeConfig,
    demo: &Demo,
    only: Option<&str>,
) -> Result<(Handle, JoinHandle<()>), String> {
    let collaborators = Collaborators {
        provider: Arc::new(HeapProvider::new(demo.heap.clone())),
        engine: Arc::new(Graphviz::new(&config.dot_program)),
        host: Arc::new(Headless),
        backend: Arc::new(FileBackend),
    };
    let (handle, task) = heapvis_runtime::start(config, collaborators);
    let mut registered = 0;
    for (label, obj) in &demo.bindings {
        if only.is_some_and(|only| only != label.as_str()) {
            continue;
        }
        handle.register(ObjectRef::new(obj), label.clone()).await;
        registered += 1;
    }
    if registered == 0 {
        return Err(format!(
            "no binding named {:?} (have: {})",
            only.unwrap_or_default(),
            demo.bindings
                .iter()
                .map(|(label, _)| label.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ));
    }
    Ok((handle, task))
}

/// Drops the handle and waits until the reactor has drained its queue.
async fn finish(handle: Handle, task: JoinHandle<()>) -> Result<Arc<AppState>, String> {
    let state = handle.state().clone();
    drop(handle);
    task.await.map_err(|e| format!("reactor task failed: {e}"))?;
    Ok(state)
}

async fn run_demo(
    config: RuntimeConfig,
    out: Option<String>,
    graph: bool,
    force: Option<String>,
) -> Result<(), String> {
    let demo = Demo::build()?;
    let (handle, task) = watch(config, &demo, None).await?;

    if let Some(label) = force {
        let obj = demo
            .get(&label)
            .ok_or_else(|| format!("no binding named {label:?}"))?;
        if !demo.heap.force(obj) {
            info!(%label, "already evaluated");
        }
        handle.request_update().await;
    }
    if graph {
        handle.switch_view().await;
    }
    let out = out.unwrap_or_else(|| DEFAULT_OUT.to_string());
    handle.export_to(&out).await?;

    let state = finish(handle, task).await?;
    if state.failed_exports() > 0 {
        return Err(format!("export to {out} failed, see the log for details"));
    }
    let view = state.view_state.lock().active;
    if graph && view != ViewKind::Graph {
        eprintln!("layout engine unavailable, exported the list view instead");
    }
    let history = state.history.lock().len();
    info!(%out, ?view, history, "demo finished");
    Ok(())
}

async fn run_dump(config: RuntimeConfig, label: Option<String>, graph: bool) -> Result<(), String> {
    let demo = Demo::build()?;
    let (handle, task) = watch(config, &demo, label.as_deref()).await?;
    if graph {
        handle.switch_view().await;
    }
    let state = finish(handle, task).await?;
    let dump = state.dump();
    println!(
        "{}",
        facet_json::to_string_pretty(&dump).map_err(|e| format!("encode snapshot dump: {e}"))?
    );
    Ok(())
}

fn run_probe(config: &RuntimeConfig) -> Result<(), String> {
    let engine = Graphviz::new(&config.dot_program);
    let report = ProbeReport {
        program: engine.program().display().to_string(),
        available: engine.is_available(),
    };
    println!(
        "{}",
        facet_json::to_string_pretty(&report).map_err(|e| format!("encode probe report: {e}"))?
    );
    if report.available {
        Ok(())
    } else {
        Err(format!("{} could not be run", report.program))
    }
}
