// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! brepmesh - builds a B-rep model from a JSON description and meshes it.
//!
//! ```text
//! brepmesh <model.json> [--output <mesh.json>]
//! ```
//!
//! Faces are reconciled and meshed as one set, then every edge no face
//! or composite uses gets a line mesh. The report (nodes, elements,
//! diagnostics and validation issues) goes to `--output` or stdout.
//! Log verbosity follows `RUST_LOG`.

use anyhow::{bail, Context, Result};
use brepmesh_topology::{BrepArena, Diagnostics, EdgeSet, FaceSet, InMemoryMesh};
use std::path::PathBuf;

mod model;
mod report;

use model::Model;
use report::MeshReport;

#[derive(Debug, PartialEq)]
struct Args {
    model: PathBuf,
    output: Option<PathBuf>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args> {
    let mut model = None;
    let mut output = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-o" | "--output" => {
                let path = args.next().context("--output needs a path")?;
                output = Some(PathBuf::from(path));
            }
            flag if flag.starts_with('-') => bail!("unknown option {flag}"),
            _ if model.is_none() => model = Some(PathBuf::from(arg)),
            _ => bail!("unexpected argument {arg}"),
        }
    }
    let model = model.context("usage: brepmesh <model.json> [--output <mesh.json>]")?;
    Ok(Args { model, output })
}

/// Builds and meshes `model`, returning the report.
fn run(model: &Model) -> Result<MeshReport> {
    let config = model.meshing_config();
    tracing::debug!(?config, "Meshing configuration");

    let mut arena = BrepArena::with_config(config);
    let mut diag = Diagnostics::new();
    let faces: FaceSet = model.build(&mut arena, &mut diag)?.into_iter().collect();

    let mut mesh = InMemoryMesh::new();
    let mut stats = faces.mesh_all(&mut arena, &mut mesh, &mut diag);

    let free: EdgeSet = arena
        .all_edges()
        .iter()
        .filter(|&e| !arena.edge_in_use(e))
        .collect();
    stats += free.mesh_all(&mut arena, &mut mesh, &mut diag);

    let issues = arena.validate();
    for issue in &issues {
        tracing::warn!(%issue, "Model inconsistency");
    }
    tracing::info!(
        faces = faces.len(),
        free_edges = free.len(),
        nodes = stats.nodes_created,
        elements = stats.elements_created,
        warnings = diag.warnings().count(),
        "Meshing finished"
    );

    Ok(MeshReport::collect(&arena, &mesh, stats, &diag, &issues))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args(std::env::args().skip(1))?;
    let text = std::fs::read_to_string(&args.model)
        .with_context(|| format!("reading {}", args.model.display()))?;
    let model = Model::from_json(&text)?;
    tracing::info!(
        model = %args.model.display(),
        points = model.points.len(),
        surfaces = model.surfaces.len(),
        "Loaded model"
    );

    let report = run(&model)?;
    let json = serde_json::to_string_pretty(&report)?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            tracing::info!(output = %path.display(), "Wrote mesh report");
        }
        None => println!("{json}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<Args> {
        parse_args(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn parses_model_and_output() {
        let parsed = args(&["plate.json", "--output", "out.json"]).unwrap();
        assert_eq!(parsed.model, PathBuf::from("plate.json"));
        assert_eq!(parsed.output, Some(PathBuf::from("out.json")));
        assert!(args(&[]).is_err());
        assert!(args(&["a.json", "b.json"]).is_err());
        assert!(args(&["a.json", "--verbose"]).is_err());
    }

    #[test]
    fn sample_plate_meshes_cleanly() {
        let model = Model::from_json(include_str!("../models/plate.json")).unwrap();
        let report = run(&model).unwrap();

        assert!(report.issues.is_empty());
        assert!(report.diagnostics.iter().all(|d| d.severity != "error"));
        // two 4x2 panels sharing a column, plus a 3-piece stiffener off the top edge
        assert_eq!(report.elements.iter().filter(|e| e.kind == "quad4").count(), 16);
        assert_eq!(report.elements.iter().filter(|e| e.kind == "line2").count(), 3);
        assert_eq!(report.nodes.len(), 9 * 3 + 3);
    }
}
