//! The report ("insight") functions. Each one reads already-loaded frames,
//! writes its fixed output files into the sink directory and reports its own
//! failure to the dispatcher instead of aborting the batch. Output filenames
//! are unique per report; two reports must never target the same name.

use std::collections::HashSet;
use std::path::Path;

use log::debug;
use regex::Regex;
use snafu::{ensure, ResultExt};

use batchframe::{Frame, Value};

use crate::analysis::{
    charts, map, proposals, regions, AnalysisResult, BadNetworkPatternSnafu, MissingColumnSnafu,
    ReadingProposalsSnafu, RenderingArtifactSnafu, WritingReportSnafu,
};

fn require_columns(frame: &Frame, dataset: &str, columns: &[&str]) -> AnalysisResult<()> {
    for column in columns {
        ensure!(
            frame.has_column(column),
            MissingColumnSnafu {
                dataset,
                column: *column,
            }
        );
    }
    Ok(())
}

fn write_report(frame: &Frame, path: &Path) -> AnalysisResult<()> {
    frame.write_csv(path).context(WritingReportSnafu)
}

/// Case-insensitive match against a categorical text cell. The source
/// exports are inconsistent about casing across election years.
fn eq_fold(value: &Value, expected: &str) -> bool {
    value
        .text()
        .map_or(false, |s| s.trim().eq_ignore_ascii_case(expected))
}

fn region_column(row: batchframe::Row<'_>) -> Value {
    match row.text("SG_UF").and_then(regions::region_of) {
        Some(region) => Value::Str(region.to_string()),
        None => Value::Null,
    }
}

/// Report 1: mean declared assets of elected mayors against everyone else.
pub fn elected_mayor_assets(
    candidates: &Frame,
    assets: &Frame,
    sink: &Path,
) -> AnalysisResult<()> {
    require_columns(
        candidates,
        "candidatos",
        &["DS_CARGO", "DS_SIT_TOT_TURNO", "SQ_CANDIDATO"],
    )?;
    require_columns(
        assets,
        "candidatos_bens",
        &["SQ_CANDIDATO", "VR_BEM_CANDIDATO"],
    )?;

    let elected_ids: HashSet<String> = candidates
        .filter(|r| {
            eq_fold(r.value("DS_CARGO"), "prefeito") && eq_fold(r.value("DS_SIT_TOT_TURNO"), "eleito")
        })
        .rows()
        .map(|r| r.value("SQ_CANDIDATO").render())
        .collect();
    debug!("elected mayors: {}", elected_ids.len());

    let elected = assets.filter(|r| elected_ids.contains(&r.value("SQ_CANDIDATO").render()));
    let others = assets.filter(|r| !elected_ids.contains(&r.value("SQ_CANDIDATO").render()));
    let mean_elected = elected.mean("VR_BEM_CANDIDATO").unwrap_or(0.0);
    let mean_others = others.mean("VR_BEM_CANDIDATO").unwrap_or(0.0);

    let mut summary = Frame::with_columns(["Status", "Média de Bens Declarados"]);
    summary.push_row(vec![
        Value::Str("Eleitos".to_string()),
        Value::Num(mean_elected),
    ]);
    summary.push_row(vec![
        Value::Str("Não Eleitos".to_string()),
        Value::Num(mean_others),
    ]);
    write_report(&summary, &sink.join("media_bens_eleitos.csv"))?;

    let svg = sink.join("media_bens_eleitos.svg");
    charts::bar_chart(
        &svg,
        "Média de Bens Declarados por Prefeitos Eleitos vs Não Eleitos",
        &[("Eleitos", mean_elected), ("Não Eleitos", mean_others)],
    )
    .context(RenderingArtifactSnafu { path: svg })
}

/// Report 2: number of elected candidates per coalition against the number
/// of parties composing it.
pub fn coalition_size_versus_wins(
    candidates: &Frame,
    coalitions: &Frame,
    sink: &Path,
) -> AnalysisResult<()> {
    require_columns(
        candidates,
        "candidatos",
        &["DS_SIT_TOT_TURNO", "SQ_COLIGACAO"],
    )?;
    require_columns(
        coalitions,
        "coligacoes",
        &["SQ_COLIGACAO", "DS_COMPOSICAO_FEDERACAO"],
    )?;

    let sized = coalitions.add_column("NUMERO_PARTIDOS", |r| {
        match r.text("DS_COMPOSICAO_FEDERACAO") {
            Some(composition) => Value::Num((composition.matches(',').count() + 1) as f64),
            None => Value::Null,
        }
    });
    let wins = candidates
        .filter(|r| eq_fold(r.value("DS_SIT_TOT_TURNO"), "eleito"))
        .group_count(&["SQ_COLIGACAO"], "NUM_ELEITOS");
    let detailed = sized.inner_join(&wins, "SQ_COLIGACAO");
    write_report(&detailed, &sink.join("coligacoes_detalhadas.csv"))?;

    let points: Vec<(f64, f64)> = detailed
        .rows()
        .filter_map(|r| Some((r.number("NUMERO_PARTIDOS")?, r.number("NUM_ELEITOS")?)))
        .collect();
    let svg = sink.join("coligacoes_eleitos.svg");
    charts::scatter_plot(
        &svg,
        "Número de Eleitos por Coligação x Número de Partidos",
        "Número de Partidos",
        "Número de Eleitos",
        &points,
    )
    .context(RenderingArtifactSnafu { path: svg })
}

/// Report 3: the party fielding the most candidates in each UF.
pub fn largest_party_per_state(candidates: &Frame, sink: &Path) -> AnalysisResult<()> {
    require_columns(candidates, "candidatos", &["SG_UF", "SG_PARTIDO"])?;

    let per_state = candidates.group_count(&["SG_UF", "SG_PARTIDO"], "NUM_CANDIDATOS");
    let top = per_state.top_by_group("SG_UF", "NUM_CANDIDATOS");
    write_report(&top, &sink.join("maior_partido_por_uf.csv"))?;

    let bars: Vec<(String, f64, String)> = top
        .rows()
        .map(|r| {
            (
                r.value("SG_UF").render(),
                r.number("NUM_CANDIDATOS").unwrap_or(0.0),
                r.value("SG_PARTIDO").render(),
            )
        })
        .collect();
    let svg = sink.join("partido_maior_por_uf.svg");
    charts::hbar_chart(
        &svg,
        "Partido com Maior Quantidade de Candidatos por UF",
        &bars,
    )
    .context(RenderingArtifactSnafu { path: svg })
}

/// Report 4: candidacies per party and macro-region. Rows whose UF has no
/// known region drop out of the grouping.
pub fn party_distribution_by_region(candidates: &Frame, sink: &Path) -> AnalysisResult<()> {
    require_columns(candidates, "candidatos", &["SG_UF", "SG_PARTIDO"])?;

    let with_region = candidates.add_column("REGIAO", region_column);
    let grouped = with_region.group_count(&["REGIAO", "SG_PARTIDO"], "NUM_CANDIDATOS");
    write_report(&grouped, &sink.join("distribuicao_partido_regiao.csv"))?;

    let entries: Vec<(String, String, f64)> = grouped
        .rows()
        .map(|r| {
            (
                r.value("REGIAO").render(),
                r.value("SG_PARTIDO").render(),
                r.number("NUM_CANDIDATOS").unwrap_or(0.0),
            )
        })
        .collect();
    let svg = sink.join("distribuicao_partido_regiao.svg");
    charts::grouped_bar_chart(
        &svg,
        "Distribuição de Candidaturas por Partido e Região",
        &entries,
    )
    .context(RenderingArtifactSnafu { path: svg })
}

/// Report 5: the dominant party per UF over the major municipal offices.
pub fn dominant_party_major_offices(candidates: &Frame, sink: &Path) -> AnalysisResult<()> {
    require_columns(
        candidates,
        "candidatos",
        &["DS_CARGO", "SG_UF", "SG_PARTIDO"],
    )?;

    let major = ["prefeito", "vice-prefeito", "vereador"];
    let offices = candidates.filter(|r| {
        major
            .iter()
            .any(|office| eq_fold(r.value("DS_CARGO"), office))
    });
    let per_state = offices.group_count(&["SG_UF", "SG_PARTIDO"], "TOTAL_CANDIDATOS");
    let dominant = per_state.top_by_group("SG_UF", "TOTAL_CANDIDATOS");
    write_report(&dominant, &sink.join("partido_dominante_uf.csv"))?;

    let bars: Vec<(String, f64, String)> = dominant
        .rows()
        .map(|r| {
            (
                r.value("SG_UF").render(),
                r.number("TOTAL_CANDIDATOS").unwrap_or(0.0),
                r.value("SG_PARTIDO").render(),
            )
        })
        .collect();
    let svg = sink.join("partido_dominante_por_uf.svg");
    charts::hbar_chart(
        &svg,
        "Partido Dominante por UF (Prefeito, Vice e Vereadores)",
        &bars,
    )
    .context(RenderingArtifactSnafu { path: svg })
}

/// Report 6: indigenous and quilombola candidates per macro-region.
pub fn indigenous_quilombola_by_region(complementary: &Frame, sink: &Path) -> AnalysisResult<()> {
    require_columns(
        complementary,
        "candidatos_info_complementar",
        &["SG_UF", "CD_ETNIA_INDIGENA", "ST_QUILOMBOLA"],
    )?;

    let with_region = complementary.add_column("REGIAO", region_column);
    let indigenous = with_region
        .filter(|r| r.number("CD_ETNIA_INDIGENA").map_or(false, |code| code != 0.0))
        .group_count(&["REGIAO"], "NUM_INDIGENAS");
    let quilombola = with_region
        .filter(|r| eq_fold(r.value("ST_QUILOMBOLA"), "s"))
        .group_count(&["REGIAO"], "NUM_QUILOMBOLAS");

    write_report(&indigenous, &sink.join("indigenas_por_regiao.csv"))?;
    write_report(&quilombola, &sink.join("quilombolas_por_regiao.csv"))?;

    let mut entries: Vec<(String, String, f64)> = Vec::new();
    for r in indigenous.rows() {
        entries.push((
            r.value("REGIAO").render(),
            "Indígenas".to_string(),
            r.number("NUM_INDIGENAS").unwrap_or(0.0),
        ));
    }
    for r in quilombola.rows() {
        entries.push((
            r.value("REGIAO").render(),
            "Quilombolas".to_string(),
            r.number("NUM_QUILOMBOLAS").unwrap_or(0.0),
        ));
    }
    let svg = sink.join("indigenas_quilombolas_regiao.svg");
    charts::grouped_bar_chart(
        &svg,
        "Candidatos Indígenas e Quilombolas por Região",
        &entries,
    )
    .context(RenderingArtifactSnafu { path: svg })
}

/// Report 7: the social network candidates prefer, per UF, derived from the
/// declared profile URLs.
pub fn preferred_social_network(social: &Frame, sink: &Path) -> AnalysisResult<()> {
    require_columns(social, "candidatos_redes_sociais", &["SG_UF", "DS_URL"])?;

    let network = Regex::new("(facebook|instagram|twitter|youtube|linkedin)")
        .context(BadNetworkPatternSnafu)?;
    let typed = social.add_column("TIPO_REDE", |r| {
        let url = r.text("DS_URL").unwrap_or("").to_ascii_lowercase();
        let kind = network
            .find(&url)
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| "outros".to_string());
        Value::Str(kind)
    });
    let grouped = typed.group_count(&["SG_UF", "TIPO_REDE"], "NUM_CANDIDATOS");
    write_report(&grouped, &sink.join("redes_por_partido_uf.csv"))?;

    let entries: Vec<(String, String, f64)> = grouped
        .rows()
        .map(|r| {
            (
                r.value("SG_UF").render(),
                r.value("TIPO_REDE").render(),
                r.number("NUM_CANDIDATOS").unwrap_or(0.0),
            )
        })
        .collect();
    let svg = sink.join("rede_social_uf.svg");
    charts::grouped_bar_chart(&svg, "Rede Social Preferida dos Candidatos por UF", &entries)
        .context(RenderingArtifactSnafu { path: svg })
}

/// Report 8: the ten most frequent terms across the government-proposal
/// text extracts, as a table and a word cloud.
pub fn proposal_term_frequencies(
    proposals_dir: &Path,
    stopwords: &HashSet<&'static str>,
    sink: &Path,
) -> AnalysisResult<()> {
    let ranked = proposals::term_frequencies(proposals_dir, stopwords)
        .context(ReadingProposalsSnafu { dir: proposals_dir })?;
    let top: Vec<(String, u64)> = ranked.into_iter().take(10).collect();

    let mut summary = Frame::with_columns(["Termo", "Frequência"]);
    for (term, count) in &top {
        summary.push_row(vec![
            Value::Str(term.clone()),
            Value::Num(*count as f64),
        ]);
    }
    write_report(&summary, &sink.join("termos_propostas.csv"))?;

    let svg = sink.join("nuvem_termos_propostas.svg");
    charts::word_cloud(&svg, "Principais Termos nas Propostas de Governo", &top)
        .context(RenderingArtifactSnafu { path: svg })
}

/// Report 9: the election-results map. Markers are computed up front as
/// plain values and rendered in a single pass; nothing shared is mutated.
pub fn election_results_map(sink: &Path) -> AnalysisResult<()> {
    let markers = map::sample_markers();
    let html = sink.join("resultado_eleicoes_mapa.html");
    map::render_map(&html, &markers).context(RenderingArtifactSnafu { path: html })
}
