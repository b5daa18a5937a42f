//! Prints the classes and image counts of an image source after balancing.

use std::path::PathBuf;

use miso::dataset::{DirectoryOptions, FilenamesDataset, SourceOptions};

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    miso::logging::init_stderr_only();

    let source_options = SourceOptions {
        directory: DirectoryOptions {
            has_classes: options.has_classes,
            ..DirectoryOptions::default()
        },
        ..SourceOptions::default()
    };
    let mut dataset = FilenamesDataset::new(&options.source, source_options);
    dataset
        .load(options.min_count, options.map_others)
        .map_err(|err| err.to_string())?;

    let width = dataset
        .cls_labels()
        .iter()
        .map(|label| label.chars().count())
        .max()
        .unwrap_or(0);
    for (label, count) in dataset.cls_labels().iter().zip(dataset.cls_counts()) {
        println!("{label:<width$}  {count}");
    }
    println!(
        "{} classes, {} images",
        dataset.num_classes(),
        dataset.filenames().len()
    );
    Ok(())
}

struct CliOptions {
    source: PathBuf,
    min_count: usize,
    map_others: bool,
    has_classes: bool,
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut source: Option<PathBuf> = None;
    let mut min_count = 10usize;
    let mut map_others = false;
    let mut has_classes = true;

    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--source" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--source requires a value".to_string())?;
                source = Some(PathBuf::from(value));
            }
            "--min-count" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--min-count requires a value".to_string())?;
                min_count = value
                    .parse::<usize>()
                    .map_err(|_| format!("Invalid --min-count value: {value}"))?;
            }
            "--map-others" => map_others = true,
            "--no-classes" => has_classes = false,
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }

    let source = source.ok_or_else(help_text)?;
    Ok(CliOptions {
        source,
        min_count,
        map_others,
        has_classes,
    })
}

fn help_text() -> String {
    [
        "miso-dataset-summary",
        "",
        "Lists the classes of an image source and how many images each keeps.",
        "",
        "Usage:",
        "  miso-dataset-summary --source <path> [--min-count <n>] [--map-others] [--no-classes]",
        "",
        "Options:",
        "  --source <path>   Image directory, label CSV or XML project (required).",
        "  --min-count <n>   Drop classes with fewer images (default 10, 0 keeps all).",
        "  --map-others      Collect dropped classes into an 'others' class.",
        "  --no-classes      Treat a directory source as one unlabelled class.",
    ]
    .join("\n")
}
