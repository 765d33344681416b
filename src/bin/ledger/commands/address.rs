//! Address command - print the signing key's address

use anyhow::Result;
use bounty_ledger::auth::address_of;

use super::signing_key;

pub fn run(suri: Option<&str>) -> Result<()> {
    let pair = signing_key(suri)?;
    println!("{}", address_of(&pair));
    Ok(())
}
