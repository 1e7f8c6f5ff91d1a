// [libs/infra/db/src/repositories/proxy_repository.rs]
//! Proxy pool reads and the `synchronize` write path that reconciles a
//! freshly fetched proxy list against what is stored, by natural key.

use libsql::{params, Connection, Row, Transaction};
use mtracker_domain_models::{diff_proxies, Proxy, ProxyDescriptor, ProxyDiff};
use std::collections::BTreeMap;

use crate::errors::DbError;

const SELECT_COLUMNS: &str = "proxy_id, host, port, country, username, password FROM proxies";

fn map_row(row: &Row) -> Result<Proxy, DbError> {
    Ok(Proxy {
        id: row.get(0).map_err(DbError::QueryError)?,
        host: row.get(1).map_err(DbError::QueryError)?,
        port: row.get::<i64>(2).map_err(DbError::QueryError)? as u16,
        country: row.get(3).map_err(DbError::QueryError)?,
        username: row.get(4).map_err(DbError::QueryError)?,
        password: row.get(5).map_err(DbError::QueryError)?,
    })
}

pub async fn list_all(connection: &Connection) -> Result<Vec<Proxy>, DbError> {
    let mut rows = connection
        .query(&format!("SELECT {SELECT_COLUMNS} ORDER BY proxy_id DESC"), ())
        .await
        .map_err(DbError::QueryError)?;
    let mut proxies = Vec::new();
    while let Some(row) = rows.next().await.map_err(DbError::QueryError)? {
        proxies.push(map_row(&row)?);
    }
    Ok(proxies)
}

/// Groups the stored proxy pool by country. A `BTreeMap` gives a stable,
/// deterministic iteration order independent of insertion order.
pub async fn by_country(connection: &Connection) -> Result<BTreeMap<String, Vec<Proxy>>, DbError> {
    let mut grouped: BTreeMap<String, Vec<Proxy>> = BTreeMap::new();
    for proxy in list_all(connection).await? {
        grouped.entry(proxy.country.clone()).or_default().push(proxy);
    }
    Ok(grouped)
}

pub async fn countries(connection: &Connection) -> Result<Vec<String>, DbError> {
    let mut rows = connection
        .query("SELECT DISTINCT country FROM proxies ORDER BY country ASC", ())
        .await
        .map_err(DbError::QueryError)?;
    let mut countries = Vec::new();
    while let Some(row) = rows.next().await.map_err(DbError::QueryError)? {
        countries.push(row.get(0).map_err(DbError::QueryError)?);
    }
    Ok(countries)
}

/// Reconciles the stored proxy pool against `fetched` (already filtered
/// by the caller to `is_alive` entries). Inserts newly seen proxies,
/// deletes ones that vanished, and leaves unchanged ones untouched.
pub async fn synchronize(transaction: &Transaction, fetched: &[Proxy]) -> Result<ProxyDiff, DbError> {
    let mut current_rows = transaction
        .query(&format!("SELECT {SELECT_COLUMNS}"), ())
        .await
        .map_err(DbError::QueryError)?;
    let mut current = Vec::new();
    while let Some(row) = current_rows.next().await.map_err(DbError::QueryError)? {
        current.push(map_row(&row)?);
    }

    let fetched_descriptors: Vec<ProxyDescriptor> = fetched.iter().map(ProxyDescriptor::from).collect();
    let diff = diff_proxies(&current, &fetched_descriptors);

    for descriptor in &diff.added {
        let source = fetched
            .iter()
            .find(|p| &ProxyDescriptor::from(*p) == descriptor)
            .expect("added descriptor must originate from `fetched`");

        transaction
            .execute(
                "INSERT INTO proxies (host, port, country, username, password) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![source.host.as_str(), source.port as i64, source.country.as_str(), source.username.clone(), source.password.clone()],
            )
            .await
            .map_err(DbError::QueryError)?;
    }

    for descriptor in &diff.deleted {
        transaction
            .execute(
                "DELETE FROM proxies WHERE host = ?1 AND port = ?2 AND country = ?3 \
                 AND COALESCE(username, '') = ?4 AND COALESCE(password, '') = ?5",
                params![
                    descriptor.host.as_str(),
                    descriptor.port as i64,
                    descriptor.country.as_str(),
                    descriptor.username.as_str(),
                    descriptor.password.as_str()
                ],
            )
            .await
            .map_err(DbError::QueryError)?;
    }

    Ok(diff)
}
