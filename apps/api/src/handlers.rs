pub mod access;
pub mod assignments;
pub mod audit;
pub mod health;
pub mod permissions;
pub mod roles;
pub mod team_links;

#[cfg(test)]
mod tests;
