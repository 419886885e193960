//! CLI command implementations.

use std::collections::BTreeMap;
use std::path::Path;

use crate::config::EvolutionConfig;
use crate::embed::{
    project_2d, EmbeddingCache, EmbeddingProvider, HashedNgramEmbedding, PrecomputedEmbeddings,
};
use crate::engine::{
    document_cluster_vectors, summarize, EvolutionContext, EvolutionEngine, TfIdfNamer,
    TimeSliceBuilder,
};
use crate::format::{CacheWriter, MmapCache};
use crate::types::{ClusterId, Corpus, Evolution, LineageError, LineageResult};

/// Print the effective configuration.
pub fn cmd_config(config: &EvolutionConfig, json: bool) -> LineageResult<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(config)?);
    } else {
        print!("{}", config.to_toml()?);
    }
    Ok(())
}

/// Show per-year cumulative entity counts.
pub fn cmd_slices(corpus_path: &Path, config: &EvolutionConfig, json: bool) -> LineageResult<()> {
    let corpus = Corpus::load(corpus_path)?;
    let slices = TimeSliceBuilder::from_config(&config.slices).build(&corpus);

    if json {
        let rows: Vec<serde_json::Value> = slices
            .iter()
            .map(|s| serde_json::json!({ "year": s.year, "entities": s.len() }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        println!("Sources: {}", corpus.sources.len());
        for s in &slices {
            println!("  {}: {} entities", s.year, s.len());
        }
    }
    Ok(())
}

/// Embed every distinct corpus entity and write a cache file.
pub fn cmd_embed(
    corpus_path: &Path,
    cache_path: &Path,
    vectors: Option<&Path>,
    dimension: usize,
    json: bool,
) -> LineageResult<()> {
    let corpus = Corpus::load(corpus_path)?;
    let provider: Box<dyn EmbeddingProvider> = match vectors {
        Some(p) => Box::new(PrecomputedEmbeddings::from_json_file(p)?),
        None => Box::new(HashedNgramEmbedding::new(dimension)),
    };

    let mut cache = EmbeddingCache::new(provider.dimension());
    let added = cache.populate(
        provider.as_ref(),
        corpus.entity_lists().flat_map(|l| l.iter().map(|e| e.as_str())),
    )?;
    CacheWriter::write_to_file(&cache, cache_path)?;

    if json {
        let info = serde_json::json!({
            "file": cache_path.display().to_string(),
            "provider": provider.name(),
            "dimension": cache.dimension(),
            "entities": added,
        });
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        println!(
            "Embedded {} entities ({}, dimension {}) into {}",
            added,
            provider.name(),
            cache.dimension(),
            cache_path.display()
        );
    }
    Ok(())
}

/// Describe an embedding cache file.
pub fn cmd_info(cache_path: &Path, json: bool) -> LineageResult<()> {
    let cache = MmapCache::open(cache_path)?;
    let file_size = std::fs::metadata(cache_path)?.len();
    let header = cache.header();

    if json {
        let info = serde_json::json!({
            "file": cache_path.display().to_string(),
            "version": header.version,
            "dimension": header.dimension,
            "entities": cache.len(),
            "file_size": file_size,
        });
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        println!("File: {}", cache_path.display());
        println!("Version: {}", header.version);
        println!("Dimension: {}", header.dimension);
        println!("Entities: {}", cache.len());
        println!("File size: {}", format_size(file_size));
    }
    Ok(())
}

/// Outputs requested from `evolve` besides the evolution itself.
pub struct EvolveOutputs<'a> {
    pub evolution: &'a Path,
    pub names: Option<&'a Path>,
    pub projection: Option<&'a Path>,
    pub pretty: bool,
}

/// Run the full pipeline.
pub fn cmd_evolve(
    corpus_path: &Path,
    cache_path: Option<&Path>,
    config: EvolutionConfig,
    outputs: EvolveOutputs<'_>,
    json: bool,
) -> LineageResult<()> {
    let corpus = Corpus::load(corpus_path)?;
    let context = match cache_path {
        Some(p) => {
            let cache = MmapCache::open(p)?;
            EvolutionContext::embed_corpus(config, &corpus, &cache)?
        }
        None => {
            let provider = HashedNgramEmbedding::new(crate::types::DEFAULT_DIMENSION);
            EvolutionContext::embed_corpus(config, &corpus, &provider)?
        }
    };

    if let Some(p) = outputs.projection {
        write_json(p, &project_2d(&context.embeddings), outputs.pretty)?;
    }

    let engine = EvolutionEngine::new(context)?;
    let report = engine.run(&corpus)?;
    report.evolution.save(outputs.evolution, outputs.pretty)?;
    if let Some(p) = outputs.names {
        write_json(p, &report.names, outputs.pretty)?;
    }

    if json {
        let selected: BTreeMap<String, usize> = report
            .selections
            .iter()
            .map(|(y, s)| (y.to_string(), s.best))
            .collect();
        let info = serde_json::json!({
            "years": report.evolution.years().collect::<Vec<_>>(),
            "identities": report.names.len(),
            "selected_k": selected,
            "skipped": report.skipped,
        });
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        for (year, selection) in &report.selections {
            let links = report.links.get(year).map_or(0, |l| l.len());
            let births = report.births.get(year).map_or(0, |b| b.len());
            println!(
                "{}: k={} inherited={} born={}",
                year, selection.best, links, births
            );
        }
        for s in &report.skipped {
            println!("{}: skipped ({})", s.year, s.reason);
        }
        println!(
            "Wrote {} years, {} identities to {}",
            report.evolution.len(),
            report.names.len(),
            outputs.evolution.display()
        );
    }
    Ok(())
}

/// Derive unique names for an existing evolution.
pub fn cmd_name(
    evolution_path: &Path,
    config: &EvolutionConfig,
    out: Option<&Path>,
    json: bool,
) -> LineageResult<()> {
    let evolution = Evolution::load(evolution_path)?;
    let names = TfIdfNamer::from_config(&config.naming)?.name_evolution(&evolution);

    if let Some(p) = out {
        write_json(p, &names, true)?;
    }
    if json {
        println!("{}", serde_json::to_string_pretty(&names)?);
    } else {
        for (id, name) in &names {
            println!("{:<16} {}", id.as_str(), name);
        }
    }
    Ok(())
}

/// Print birth, last sighting and sizes per identity.
pub fn cmd_summary(
    evolution_path: &Path,
    names_path: Option<&Path>,
    config: &EvolutionConfig,
    json: bool,
) -> LineageResult<()> {
    let evolution = Evolution::load(evolution_path)?;
    let names: BTreeMap<ClusterId, String> = match names_path {
        Some(p) => serde_json::from_str(&std::fs::read_to_string(p)?)?,
        None => TfIdfNamer::from_config(&config.naming)?.name_evolution(&evolution),
    };
    let summaries = summarize(&evolution, &names);

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    } else {
        for s in &summaries {
            let sizes: Vec<String> = s.sizes.iter().map(|(y, n)| format!("{y}:{n}")).collect();
            println!(
                "{} [{}] {}-{} {}",
                s.id,
                s.name.as_deref().unwrap_or("-"),
                s.born,
                s.last_seen,
                sizes.join(" ")
            );
        }
    }
    Ok(())
}

/// Per-document cluster count vectors for one year.
pub fn cmd_vectors(
    corpus_path: &Path,
    evolution_path: &Path,
    year: i32,
    json: bool,
) -> LineageResult<()> {
    let corpus = Corpus::load(corpus_path)?;
    let evolution = Evolution::load(evolution_path)?;
    if evolution.slice(year).is_none() {
        return Err(LineageError::EmptySlice(year));
    }

    let mut all = BTreeMap::new();
    let mut columns = Vec::new();
    for source in &corpus.sources {
        let (cols, vectors) = document_cluster_vectors(source, &evolution, year);
        columns = cols;
        all.insert(source.name.clone(), vectors);
    }

    if json {
        let out = serde_json::json!({ "year": year, "clusters": columns, "documents": all });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        let header: Vec<&str> = columns.iter().map(|c| c.as_str()).collect();
        println!("source\tdocument\t{}", header.join("\t"));
        for (source, vectors) in &all {
            for (doc, counts) in vectors {
                let row: Vec<String> = counts.iter().map(|c| c.to_string()).collect();
                println!("{}\t{}\t{}", source, doc, row.join("\t"));
            }
        }
    }
    Ok(())
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T, pretty: bool) -> LineageResult<()> {
    let data = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    std::fs::write(path, data)?;
    Ok(())
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
