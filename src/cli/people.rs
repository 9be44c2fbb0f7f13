use comfy_table::{Cell, Table};

use crate::db::{count_summaries, get_connection, init_db};
use crate::error::Result;
use crate::reports::list_people;
use crate::settings::resolve_db_path;

pub fn run(db_override: Option<&str>) -> Result<()> {
    let conn = get_connection(&resolve_db_path(db_override))?;
    init_db(&conn)?;
    let people = list_people(&conn)?;
    if people.is_empty() {
        println!("No people yet. Import a statement with `tally import FILE --person NAME`.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Person", "Months", "Summaries", "Latest Month"]);
    for p in people {
        table.add_row(vec![
            Cell::new(p.person_name),
            Cell::new(p.months),
            Cell::new(p.summaries),
            Cell::new(p.last_month),
        ]);
    }
    println!("People ({} summaries)\n{table}", count_summaries(&conn)?);
    Ok(())
}
