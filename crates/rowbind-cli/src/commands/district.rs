//! District lookups through the declared `DistrictDao` interface

use clap::{Args, Subcommand};
use rowbind_cli::{close_after, connect, DistrictDao, DistrictDaoProxy};
use rowbind_query::create_proxy;
use serde::Serialize;
use tracing::debug;

/// District lookup commands
#[derive(Args)]
pub struct DistrictCommand {
    #[command(subcommand)]
    pub command: DistrictSubcommand,
}

#[derive(Subcommand)]
pub enum DistrictSubcommand {
    /// Fetch a district by id
    Get(GetDistrictCommand),
    /// List the districts under a parent
    Children(ChildrenCommand),
    /// Find districts by exact name
    ByName(ByNameCommand),
}

/// Fetch a district by id
#[derive(Args)]
pub struct GetDistrictCommand {
    /// District id
    #[arg(long)]
    pub id: i32,
}

/// List the districts under a parent
#[derive(Args)]
pub struct ChildrenCommand {
    /// Parent district id
    #[arg(long)]
    pub parent_id: i32,
}

/// Find districts by exact name
#[derive(Args)]
pub struct ByNameCommand {
    /// District name
    #[arg(long)]
    pub name: String,
}

impl DistrictCommand {
    pub fn execute(self, database_url: &str) -> anyhow::Result<()> {
        let rt = tokio::runtime::Runtime::new()?;

        rt.block_on(async move {
            let source = connect(database_url).await?;

            close_after(source, |source| async move {
                let dao: DistrictDaoProxy = create_proxy(source);

                match self.command {
                    DistrictSubcommand::Get(cmd) => {
                        debug!("Looking up district {}", cmd.id);
                        print_json(&dao.get_by_id(cmd.id).await?)
                    }
                    DistrictSubcommand::Children(cmd) => {
                        debug!("Listing children of district {}", cmd.parent_id);
                        print_json(&dao.get_list_by_parent_id(cmd.parent_id).await?)
                    }
                    DistrictSubcommand::ByName(cmd) => {
                        debug!("Finding districts named {}", cmd.name);
                        print_json(&dao.find_by_name(cmd.name).await?)
                    }
                }
            })
            .await
        })
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
