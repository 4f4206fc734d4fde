use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;
use std::collections::BTreeMap;
use std::fs;

use vanish::cli::Args;
use vanish::entities::AnnotationStore;
use vanish::persist::AnnotationFile;

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::from_default_env().filter_level(level).init();

    let text = fs::read_to_string(&args.annotations)
        .with_context(|| format!("reading {}", args.annotations.display()))?;
    let file = AnnotationFile::from_json(&text)
        .with_context(|| format!("parsing {}", args.annotations.display()))?;

    // normalizing through the store merges duplicate frame indices and
    // prunes records that arrived empty
    let video = file.video.clone();
    let store = AnnotationStore::from_keyframes(file.keyframes);

    println!("{}", args.annotations.display());
    if let Some(video) = &video {
        println!("  video:     {}", video);
    }
    println!("  keyframes: {}", store.len());

    if let (Some(first), Some(last)) = (
        store.all_sorted().next().map(|k| k.frame_idx),
        store.all_sorted().last().map(|k| k.frame_idx),
    ) {
        println!("  frames:    {}..={}", first, last);
    }

    let mut marks_per_object: BTreeMap<u32, usize> = BTreeMap::new();
    for kf in store.all_sorted() {
        for c in kf.pos_clicks.iter().chain(&kf.neg_clicks) {
            *marks_per_object.entry(c.object_id).or_default() += 1;
        }
        for r in &kf.rects {
            *marks_per_object.entry(r.object_id).or_default() += 1;
        }
    }
    for (object_id, count) in &marks_per_object {
        println!("  object {}:  {} marks", object_id, count);
    }

    if args.rewrite {
        let out = AnnotationFile { video, keyframes: store.all_sorted().cloned().collect() };
        let json = out.to_json().context("serializing normalized annotations")?;
        fs::write(&args.annotations, json + "\n")
            .with_context(|| format!("writing {}", args.annotations.display()))?;
        println!("rewrote {} normalized", args.annotations.display());
    }

    Ok(())
}
