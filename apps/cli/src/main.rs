use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use client_core::{DragMove, HttpItemGateway, ListController, Viewport};
use shared::domain::ItemId;

#[derive(Parser, Debug)]
struct Args {
    #[arg(long, default_value = "http://127.0.0.1:3000")]
    server_url: String,
    #[arg(long, default_value = "")]
    filter: String,
    #[arg(long, default_value_t = 20)]
    limit: u32,
    /// Rows the demo window shows at once.
    #[arg(long, default_value_t = 40)]
    rows: u32,
    /// Move the first id to the position of the second.
    #[arg(long, num_args = 2, value_names = ["MOVED", "TARGET"])]
    move_item: Option<Vec<i64>>,
    /// Flip selection of this id.
    #[arg(long)]
    toggle: Option<i64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();

    let gateway = Arc::new(HttpItemGateway::new(&args.server_url)?);
    let viewport = Viewport {
        row_height: 1,
        height: args.rows,
        lookahead_rows: 2,
    };
    let controller = ListController::new(gateway, viewport, args.limit);

    controller.set_filter(&args.filter).await;

    if let Some(pair) = &args.move_item {
        let drag = DragMove {
            moved: ItemId(pair[0]),
            target: ItemId(pair[1]),
        };
        match controller.reorder(drag).await {
            Some(handle) => handle.await?,
            None => println!("move ignored: both ids must be loaded"),
        }
    }

    if let Some(id) = args.toggle {
        controller.toggle(ItemId(id)).await.await?;
    }

    let snapshot = controller.snapshot().await;
    for item in &snapshot.items {
        let mark = if snapshot.selected.contains(&item.id) {
            "[x]"
        } else {
            "[ ]"
        };
        println!("{mark} {:>5}  {}", item.id.0, item.name);
    }
    if snapshot.has_more {
        println!("({} loaded, more available)", snapshot.items.len());
    }

    Ok(())
}
