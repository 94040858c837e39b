use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use libtaigi::{
    compile_source, create_ime_engine, layout_from_name, open_user_store, parse_key_sequence,
    ImeEngine, KeyResult, PhraseTree, TaigiConfig,
};
use libtaigi_core::{sequence_from_text, text_from_sequence, PhraseKind, UserPhraseRecord};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "libtaigi")]
#[command(about = "A Rust implementation of a Taiwanese (Tâi-lô / Bopomofo) input method")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive REPL: each line is a key script, e.g. `hk4<D>3<E>`
    Repl {
        /// Dictionary directory (overrides the configuration)
        #[arg(short, long)]
        data_dir: Option<PathBuf>,
        /// Keyboard layout name
        #[arg(short, long)]
        layout: Option<String>,
        /// User phrase store file
        #[arg(short, long)]
        user_store: Option<PathBuf>,
    },
    /// Compile a phrase list into `index.bin` + `phrase.bin`
    Compile {
        /// Source file: `phrase freq syllable...` per line
        #[arg(short, long)]
        input: PathBuf,
        /// Output directory
        #[arg(short, long)]
        output: PathBuf,
    },
    /// List dictionary phrases for a syllable sequence
    Lookup {
        #[arg(short, long)]
        data_dir: PathBuf,
        /// Syllables, e.g. "tsiah8 png7" or "ㄘㄜˋ"
        syllables: String,
    },
    /// Inspect or edit learned phrases
    Userphrase {
        /// User phrase store file
        #[arg(short, long)]
        store: PathBuf,
        #[command(subcommand)]
        action: UserphraseAction,
    },
}

#[derive(Subcommand)]
enum UserphraseAction {
    /// Print every learned phrase
    List,
    /// Write every learned phrase as JSON
    Export {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Forget one phrase
    Remove {
        phrase: String,
        syllables: String,
    },
}

#[derive(Serialize)]
struct ExportedPhrase<'a> {
    syllables: String,
    #[serde(flatten)]
    record: &'a UserPhraseRecord,
}

fn load_config(path: Option<&Path>) -> anyhow::Result<TaigiConfig> {
    match path {
        Some(path) => TaigiConfig::load(path)
            .with_context(|| format!("reading configuration {}", path.display())),
        None => Ok(TaigiConfig::default()),
    }
}

fn print_state(engine: &ImeEngine, result: KeyResult) {
    let ctx = engine.context();
    if result == KeyResult::NoSuchSyllable {
        println!("(no such syllable)");
    }
    println!("preedit: {}|{}", ctx.preedit_text, ctx.slot_text);
    if !ctx.candidates.is_empty() {
        let line: Vec<String> = ctx
            .candidates
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{}.{}", (i + 1) % 10, c))
            .collect();
        println!("[{}] {}", ctx.auxiliary_text, line.join(" "));
    }
}

fn run_repl(
    mut config: TaigiConfig,
    data_dir: Option<PathBuf>,
    layout: Option<String>,
    user_store: Option<PathBuf>,
) -> anyhow::Result<()> {
    if let Some(dir) = data_dir {
        config.data_dir = Some(dir);
    }
    if let Some(name) = layout {
        config.keyboard_layout =
            layout_from_name(&name).with_context(|| format!("unknown layout '{name}'"))?;
    }
    if let Some(path) = user_store {
        config.user_store_path = Some(path);
    }
    let mut engine = create_ime_engine(&config).context("opening engine")?;

    println!(
        "libtaigi REPL ({} layout) - type keys, <E> is Enter, <D> opens choices",
        engine.layout()
    );
    println!("Ctrl-D to exit.");

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("reading stdin")?;
        let mut last = KeyResult::Ignore;
        let mut committed = String::new();
        for key in parse_key_sequence(&line) {
            last = engine.process_key(key);
            committed.push_str(engine.commit_string());
        }
        if !committed.is_empty() {
            println!("commit: {committed}");
        }
        print_state(&engine, last);
    }
    Ok(())
}

fn handle_compile(input: &Path, output: &Path) -> anyhow::Result<()> {
    let file = File::open(input).with_context(|| format!("opening {}", input.display()))?;
    let tree = compile_source(BufReader::new(file))?.build();
    std::fs::create_dir_all(output)?;
    tree.save(output)
        .with_context(|| format!("writing dictionary to {}", output.display()))?;
    println!("wrote {} nodes to {}", tree.node_count(), output.display());
    Ok(())
}

fn handle_lookup(data_dir: &Path, syllables: &str) -> anyhow::Result<()> {
    let tree = PhraseTree::open(data_dir)?;
    let seq = sequence_from_text(syllables)?;
    let Some(node) = tree.find_phrase(&seq, 0, seq.len()) else {
        println!("(no phrases for {})", text_from_sequence(&seq));
        return Ok(());
    };
    for (i, phrase) in tree.phrases(node).enumerate() {
        println!("{}. {} freq={} {:?}", i + 1, phrase.text, phrase.freq, phrase.kind);
    }
    Ok(())
}

fn handle_userphrase(store_path: &Path, action: UserphraseAction) -> anyhow::Result<()> {
    if !store_path.exists() {
        bail!("no user phrase store at {}", store_path.display());
    }
    let mut store = open_user_store(Some(store_path))?;
    match action {
        UserphraseAction::List => {
            for kind in [PhraseKind::Word, PhraseKind::Romanized] {
                for r in store.iter_all(kind)? {
                    println!(
                        "{}\t{}\tuser={} orig={} max={} time={}",
                        r.phrase,
                        text_from_sequence(&r.phones),
                        r.user_freq,
                        r.orig_freq,
                        r.max_freq,
                        r.time
                    );
                }
            }
            println!("lifetime: {}", store.lifetime());
        }
        UserphraseAction::Export { output } => {
            let mut records = store.iter_all(PhraseKind::Word)?;
            records.extend(store.iter_all(PhraseKind::Romanized)?);
            let exported: Vec<ExportedPhrase<'_>> = records
                .iter()
                .map(|record| ExportedPhrase {
                    syllables: text_from_sequence(&record.phones),
                    record,
                })
                .collect();
            let json = serde_json::to_string_pretty(&exported)?;
            match output {
                Some(path) => std::fs::write(&path, json)?,
                None => writeln!(io::stdout(), "{json}")?,
            }
        }
        UserphraseAction::Remove { phrase, syllables } => {
            let seq = sequence_from_text(&syllables)?;
            let kind = PhraseKind::detect(&phrase);
            let removed = store.remove(kind, &seq, &phrase)?;
            println!("removed {removed} phrase(s)");
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Some(Commands::Repl {
            data_dir,
            layout,
            user_store,
        }) => run_repl(config, data_dir, layout, user_store),
        Some(Commands::Compile { input, output }) => handle_compile(&input, &output),
        Some(Commands::Lookup {
            data_dir,
            syllables,
        }) => handle_lookup(&data_dir, &syllables),
        Some(Commands::Userphrase { store, action }) => handle_userphrase(&store, action),
        None => run_repl(config, None, None, None),
    }
}
