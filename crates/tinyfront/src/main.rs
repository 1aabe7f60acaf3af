use anyhow::Context as _;
use clap::{Parser, ValueEnum};
use std::{fs, path::PathBuf, time::Instant};
use tinyfront::{grammar::Grammar, lexicon::Lexicon, parser::display_tree, Frontend, FrontendConfig};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The path of lexical rule file.
    #[arg(long)]
    lex: PathBuf,

    /// The path of grammar definition file.
    #[arg(long)]
    grammar: PathBuf,

    /// The algorithm to generate LR(1) automaton.
    #[arg(long, value_enum, default_value_t = LRAlgorithm::Canonical)]
    algorithm: LRAlgorithm,

    /// Lexical classes discarded by the scanner.
    #[arg(long, value_delimiter = ',', default_value = "WS")]
    skip: Vec<String>,

    /// Write the lexical automaton to the specified file.
    #[arg(long)]
    dump_dfa: Option<PathBuf>,

    /// Write the LR(1) automaton to the specified file.
    #[arg(long)]
    dump_automaton: Option<PathBuf>,

    /// Write the parse table to the specified file.
    #[arg(long)]
    dump_table: Option<PathBuf>,

    /// The path of source file to parse.
    input: PathBuf,
}

#[derive(Debug, Copy, Clone, PartialEq, ValueEnum)]
enum LRAlgorithm {
    Canonical,
    LALR,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    tracing::debug!("parsed CLI args = {:?}", args);

    process_file(&args)
        .with_context(|| anyhow::anyhow!("errored during processing {}", args.input.display()))?;

    Ok(())
}

fn process_file(args: &Args) -> anyhow::Result<()> {
    let lexicon = Lexicon::from_file(&args.lex)
        .with_context(|| anyhow::anyhow!("failed to load {}", args.lex.display()))?;
    for err in lexicon.errors() {
        println!("[warning] {}", err);
    }

    let grammar = Grammar::from_file(&args.grammar)
        .with_context(|| anyhow::anyhow!("failed to load {}", args.grammar.display()))?;

    let mut config = FrontendConfig::default();
    match args.algorithm {
        LRAlgorithm::Canonical => config.lr1.use_canonical(),
        LRAlgorithm::LALR => config.lr1.use_lalr(),
    };
    for class in &args.skip {
        config.scan.skip(class.as_str());
    }

    let s = Instant::now();
    let frontend = Frontend::new(&lexicon, grammar, &config)?;
    tracing::info!("build frontend: {:?} elapsed", s.elapsed());

    for err in frontend.lexicon_errors() {
        println!("[warning] {}", err);
    }
    let num_conflicts = frontend.table().conflicts().len();
    if num_conflicts > 0 {
        let suffix = if num_conflicts == 1 { "" } else { "s" };
        println!(
            "[warning] The parse table has {} conflict{} resolved by default.",
            num_conflicts, suffix
        );
    }

    if let Some(path) = &args.dump_dfa {
        let dfa = frontend.scanner().automaton();
        let dump = dfa.display(|tag| lexicon.class_name(tag)).to_string();
        fs::write(path, dump).context("writing the lexical automaton")?;
    }
    if let Some(path) = &args.dump_automaton {
        let dump = frontend.automaton().display(frontend.grammar()).to_string();
        fs::write(path, dump).context("writing the LR(1) automaton")?;
    }
    if let Some(path) = &args.dump_table {
        let dump = frontend.table().display(frontend.grammar()).to_string();
        fs::write(path, dump).context("writing the parse table")?;
    }

    let source = fs::read_to_string(&args.input).context("reading the source file")?;

    let s = Instant::now();
    let parsed = frontend.parse(&source)?;
    tracing::info!("parse: {:?} elapsed", s.elapsed());

    for err in &parsed.lexical_errors {
        println!("Error: {}.", err);
    }
    for skipped in &parsed.skipped {
        let token = &skipped.token;
        println!(
            "Error: {} at line: {}, column: {}.",
            token, token.line, token.column
        );
    }
    if parsed.lexical_errors.is_empty() && parsed.skipped.is_empty() {
        println!("No error detected.");
    }
    if !parsed.is_accepted() {
        println!("[warning] The input ended before the start symbol was accepted.");
    }

    if let Some(tree) = parsed.tree() {
        print!("{}", display_tree(tree, frontend.grammar()));
    }

    Ok(())
}
