// # Account Directory Implementations
//
// Memory and file-backed implementations of the AccountDirectory trait.
// Both keep accounts in a map keyed by id; the helpers below hold the
// mutation rules they share.

pub mod file;
pub mod memory;

pub use file::FileAccountDirectory;
pub use memory::MemoryAccountDirectory;

use std::collections::HashMap;

use crate::Error;
use crate::plan::Plan;
use crate::traits::account_directory::{Account, AccountStatus, Role, normalize_registration};

type AccountMap = HashMap<String, Account>;

fn register_into(
    accounts: &mut AccountMap,
    email: &str,
    name: &str,
    role: Role,
) -> Result<Account, Error> {
    let (email, name) = normalize_registration(email, name)?;
    if accounts.values().any(|a| a.email == email) {
        return Err(Error::conflict(format!("email '{}' is already registered", email)));
    }

    let account = Account::new(email, name, role);
    accounts.insert(account.id.clone(), account.clone());
    Ok(account)
}

fn modify(
    accounts: &mut AccountMap,
    account_id: &str,
    apply: impl FnOnce(&mut Account),
) -> Result<Account, Error> {
    let account = accounts
        .get_mut(account_id)
        .ok_or_else(|| Error::not_found(format!("account '{}'", account_id)))?;
    apply(account);
    Ok(account.clone())
}

fn set_plan_in(accounts: &mut AccountMap, account_id: &str, plan: Plan) -> Result<Account, Error> {
    modify(accounts, account_id, |account| account.plan = plan)
}

fn set_status_in(
    accounts: &mut AccountMap,
    account_id: &str,
    status: AccountStatus,
) -> Result<Account, Error> {
    modify(accounts, account_id, |account| account.status = status)
}

fn sorted(accounts: &AccountMap) -> Vec<Account> {
    let mut list: Vec<Account> = accounts.values().cloned().collect();
    list.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    list
}
