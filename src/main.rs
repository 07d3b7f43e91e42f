//! ebayes_de command-line interface

use clap::Parser;
use log::{info, LevelFilter};

use ebayes_de::cli::{Cli, Commands};
use ebayes_de::prelude::*;

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    let result = match cli.command {
        Commands::Run {
            matrix,
            metadata,
            annotation,
            group,
            numerator,
            denominator,
            output,
            keep_fraction,
            p_threshold,
            effect_threshold,
            log_threshold,
            proportion,
            top,
            rank_by,
            significant_only,
            no_filter,
            no_log_check,
        } => run_analysis(
            &matrix,
            &metadata,
            annotation.as_deref(),
            &group,
            &numerator,
            &denominator,
            &output,
            keep_fraction,
            p_threshold,
            effect_threshold,
            log_threshold,
            proportion,
            top,
            rank_by.into(),
            significant_only,
            no_filter,
            no_log_check,
        ),
        Commands::Normalize {
            matrix,
            output,
            log_threshold,
        } => run_normalize(&matrix, &output, log_threshold),
        Commands::Correlate { matrix, output } => run_correlate(&matrix, &output),
        Commands::Pca {
            matrix,
            output,
            components,
        } => run_pca(&matrix, &output, components),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

fn run_analysis(
    matrix_path: &str,
    metadata_path: &str,
    annotation_path: Option<&str>,
    group: &str,
    numerator: &str,
    denominator: &str,
    output: &str,
    keep_fraction: f64,
    p_threshold: f64,
    effect_threshold: f64,
    log_threshold: f64,
    proportion: f64,
    top: usize,
    rank_by: RankBy,
    significant_only: bool,
    no_filter: bool,
    no_log_check: bool,
) -> Result<()> {
    let matrix = read_expression_matrix(matrix_path)?;
    info!(
        "loaded expression matrix: {} features x {} samples",
        matrix.n_features(),
        matrix.n_samples()
    );

    let metadata = read_sample_metadata(metadata_path)?;
    let mut dataset = ExpressionDataSet::new(matrix, metadata, group)?;

    if let Some(path) = annotation_path {
        let annotation = read_feature_annotation(path)?;
        info!(
            "loaded annotation for {} features ({} columns)",
            annotation.n_features(),
            annotation.column_names().len()
        );
        dataset = dataset.with_annotation(annotation);
    }

    let options = PipelineOptions {
        keep_fraction,
        log_threshold,
        proportion,
        apply_log: !no_log_check,
        apply_filter: !no_filter,
        weights: None,
    };

    let results = run_de(&dataset, numerator, denominator, &options)?;

    let ranked = results.ranked_by(rank_by);
    let table = if significant_only {
        ranked.filter_significant(p_threshold, effect_threshold)
    } else {
        ranked
    };
    let table = if top > 0 { table.top_table(top) } else { table };

    table.write_csv(output)?;
    info!("wrote {} rows to {}", table.n_features(), output);

    print!("{}", results.summary(p_threshold));
    Ok(())
}

fn run_normalize(matrix_path: &str, output: &str, log_threshold: f64) -> Result<()> {
    let matrix = read_expression_matrix(matrix_path)?;
    let normalized = log2_if_needed(&matrix, log_threshold)?;
    write_expression_matrix(output, &normalized)?;
    info!("wrote normalized matrix to {}", output);
    Ok(())
}

fn run_correlate(matrix_path: &str, output: &str) -> Result<()> {
    let matrix = read_expression_matrix(matrix_path)?;
    let corr = sample_correlation(&matrix);
    write_labeled_matrix(
        output,
        "sample_id",
        matrix.sample_ids(),
        matrix.sample_ids(),
        corr.view(),
    )?;
    info!(
        "wrote {0} x {0} sample correlation matrix to {1}",
        matrix.n_samples(),
        output
    );
    Ok(())
}

fn run_pca(matrix_path: &str, output: &str, components: usize) -> Result<()> {
    let matrix = read_expression_matrix(matrix_path)?;
    let pca = principal_components(&matrix, components)?;

    let labels: Vec<String> = (1..=pca.n_components())
        .map(|i| format!("PC{}", i))
        .collect();
    write_labeled_matrix(
        output,
        "sample_id",
        &pca.sample_ids,
        &labels,
        pca.scores.view(),
    )?;

    for (i, prop) in pca.proportion_of_variance.iter().enumerate() {
        info!("PC{}: {:.1}% of variance", i + 1, 100.0 * prop);
    }
    info!("wrote component scores to {}", output);
    Ok(())
}
