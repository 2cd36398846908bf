use anyhow::{Context, Result};
use diagram_model::{
    EditorConfig, Geometry, GraphModel, Style, SwimlaneManager, UndoManager, Validator,
};
use serde_json::json;
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => EditorConfig::load(Path::new(&path))?,
        None => EditorConfig::default(),
    };

    println!("Diagram Model - Transactional Graph Store");
    println!("=========================================\n");

    let mut model = GraphModel::with_config(config.model.clone());
    let history = Rc::new(RefCell::new(UndoManager::new(config.undo_history_size)));
    UndoManager::attach(&history, &mut model);
    let lanes = SwimlaneManager::new(config.swimlane.clone());

    let layer = model.default_parent().context("model has no default layer")?;

    // Two horizontal lanes; the second is sized to match the first
    let sales = model.add_vertex(
        layer,
        Some("sales"),
        json!("Sales"),
        Geometry::new(0.0, 0.0, 600.0, 160.0),
        Style::swimlane(true),
    )?;
    let shipping = model.add_vertex(
        layer,
        Some("shipping"),
        json!("Shipping"),
        Geometry::new(0.0, 160.0, 600.0, 80.0),
        Style::swimlane(true),
    )?;
    lanes.on_cells_added(&mut model, &[shipping])?;

    println!("✓ Created lanes");
    if let Some(geo) = model.geometry(shipping) {
        println!("  Shipping lane height: {}", geo.height);
    }

    let order = model.add_vertex(
        sales,
        Some("order"),
        json!("Order received"),
        Geometry::new(60.0, 40.0, 120.0, 60.0),
        Style::new(),
    )?;
    let invoice = model.add_vertex(
        sales,
        Some("invoice"),
        json!("Send invoice"),
        Geometry::new(260.0, 40.0, 120.0, 60.0),
        Style::new(),
    )?;
    let dispatch = model.add_vertex(
        shipping,
        Some("dispatch"),
        json!("Dispatch"),
        Geometry::new(260.0, 20.0, 120.0, 40.0),
        Style::new(),
    )?;

    let billing = model.add_edge(layer, Some("billing"), json!(null), Some(order), Some(invoice))?;
    let handoff = model.add_edge(layer, Some("handoff"), json!(null), Some(invoice), Some(dispatch))?;

    println!("\n✓ Connected cells");
    println!("  Cells: {}", model.cell_count());
    println!("  'billing' lives in: {:?}", model.parent(billing).and_then(|p| model.id(p)));
    println!("  'handoff' lives in: {:?}", model.parent(handoff).and_then(|p| model.id(p)));

    let validation = Validator::validate(&model);
    println!("\n✓ Validated model");
    println!("  Errors: {}", validation.errors().len());
    println!("  Warnings: {}", validation.warnings().len());

    // Moving the dispatch step into the sales lane pulls its edge along
    model.add(sales, dispatch, None)?;
    println!("\n✓ Moved 'dispatch' into the sales lane");
    println!("  'handoff' lives in: {:?}", model.parent(handoff).and_then(|p| model.id(p)));

    history.borrow_mut().undo(&mut model);
    println!("\n✓ Undo");
    println!("  'dispatch' lives in: {:?}", model.parent(dispatch).and_then(|p| model.id(p)));
    println!("  'handoff' lives in: {:?}", model.parent(handoff).and_then(|p| model.id(p)));

    history.borrow_mut().redo(&mut model);
    println!("\n✓ Redo");
    println!("  'dispatch' lives in: {:?}", model.parent(dispatch).and_then(|p| model.id(p)));

    println!("\n✓ History holds {} edits", history.borrow().len());
    tracing::info!(cells = model.cell_count(), "demo complete");

    Ok(())
}
