use clap::Args;
use comfy_table::Table;
use wayfarer_core::{geometry::GeoPoint, routing::RouteRequest};
use wayfarer_valhalla::ValhallaClient;

use crate::parsers;

#[derive(Args)]
pub struct RouteArgs {
    /// Start as "lat,lng"
    #[arg(short, long, value_parser = parsers::parse_point)]
    from: GeoPoint,

    /// Destination as "lat,lng"
    #[arg(short, long, value_parser = parsers::parse_point)]
    to: GeoPoint,

    /// Print the route as JSON instead of a table
    #[arg(long)]
    json: bool,
}

pub async fn run(args: RouteArgs, client: &ValhallaClient) -> anyhow::Result<()> {
    let request = RouteRequest {
        generation: 0,
        start: args.from,
        destination: args.to,
        heading: None,
    };

    let route = client.fetch_route(&request).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&route)?);
        return Ok(());
    }

    let unit = route.units().abbreviation();
    let mut table = Table::new();
    table.set_header(vec!["#", "Length", "Time", "Instruction"]);
    for (index, maneuver) in route.maneuvers_iter().enumerate() {
        table.add_row(vec![
            index.to_string(),
            format!("{:.2} {unit}", maneuver.length),
            format!("{:.1} mins", maneuver.time / 60.0),
            maneuver.instruction_text().to_string(),
        ]);
    }

    println!("{table}");
    println!(
        "Total: {:.2} {unit}, {:.1} mins",
        route.summary().length,
        route.summary().time / 60.0
    );

    Ok(())
}
