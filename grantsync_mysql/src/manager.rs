//! Reconcile declared grants against a live server.
//!
//! Every operation re-reads the live grants it needs; nothing is cached
//! between calls. Reads and writes are not wrapped in a transaction, so a
//! concurrent change to the same identity between the two is not detected.

use anyhow::{bail, Context, Result};
use grantsync_core::{
    log_runtime, parse_grant_row, DeclaredGrant, Grant, GrantError, GrantKind, GrantRow,
    Identity, ImportId,
};
use tracing::{debug, info, warn};

use crate::{
    client::GrantClient,
    diff::{diff_privileges, PrivilegeDiff},
    error::DbError,
};

/// Drives grant lifecycle operations through a [`GrantClient`].
pub struct GrantManager<C> {
    client: C,
}

impl<C: GrantClient + Sync> GrantManager<C> {
    /// Wrap a client.
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// The live grants held by exactly `identity`.
    ///
    /// Partial revoke rows are skipped, as are rows for other identities
    /// (some servers list wildcard-host grants alongside the requested host).
    /// An identity the server has never heard of has no grants.
    pub async fn show_grants(&self, identity: &Identity) -> Result<Vec<Grant>> {
        let sql = format!("SHOW GRANTS FOR {}", identity.sql());
        debug!("SQL: {sql}");
        let rows = match log_runtime!("show grants", self.client.query(&sql).await) {
            Ok(rows) => rows,
            Err(e) if e.category().is_ignorable() => return Ok(vec![]),
            Err(e) => return Err(execution_error(&sql, e)).context("getting grants failed"),
        };

        let mut grants = vec![];
        for row in rows {
            match parse_grant_row(&row)? {
                GrantRow::PartialRevoke => {
                    warn!(
                        "Partial revokes are not fully supported and lead to unexpected behavior. \
                        Consult https://dev.mysql.com/doc/refman/8.0/en/partial-revokes.html on \
                        how to disable them. Relevant partial revoke: {row}"
                    );
                }
                GrantRow::Grant(grant) if grant.identity() != identity => {
                    debug!(
                        "Skipping grant for {} as it doesn't match {}",
                        grant.identity(),
                        identity
                    );
                }
                GrantRow::Grant(grant) => grants.push(grant),
            }
        }
        debug!("Parsed grants are: {grants:?}");
        Ok(grants)
    }

    /// Whether the identity already holds an unmanaged grant of the same kind
    /// and grant option as `desired`. Targets are not compared.
    ///
    /// Grants that hold no privileges never conflict. Every login carries a
    /// `GRANT USAGE ON *.*` row, and a grant with an empty privilege list has
    /// nothing a new grant could clobber.
    pub async fn has_conflicting_grants(&self, desired: &Grant) -> Result<bool> {
        let live = self.show_grants(desired.identity()).await?;
        Ok(live.iter().any(|g| {
            g.grant_option() == desired.grant_option()
                && g.kind() == desired.kind()
                && !matches!(g.privileges(), Some(p) if p.is_empty())
        }))
    }

    /// Apply a new grant and return its identifier.
    pub async fn create(&self, grant: &Grant) -> Result<String> {
        if grant.kind() == GrantKind::Role {
            let has_roles = self
                .client
                .supports_roles()
                .await
                .context("failed getting role support")?;
            if !has_roles {
                bail!(GrantError::Unsupported(
                    "role grants are not supported by this version of MySQL".to_owned()
                ));
            }
        }

        if self.has_conflicting_grants(grant).await? {
            bail!(GrantError::Conflict {
                identity: grant.identity().sql(),
            });
        }

        self.execute(&grant.grant_statement()).await?;
        Ok(grant.id())
    }

    /// Check that the grant's identity still holds grants. `None` means the
    /// grant is gone and should be dropped from state.
    pub async fn read(&self, grant: &Grant) -> Result<Option<Grant>> {
        let live = self.show_grants(grant.identity()).await?;
        if live.is_empty() {
            warn!("GRANT not found for {} - removing from state", grant.identity());
            return Ok(None);
        }
        Ok(Some(grant.to_owned()))
    }

    /// Move a grant's privileges from `old` to `new` in place.
    ///
    /// Removed privileges are revoked with a partial revoke. If anything was
    /// added the full grant statement for `grant` is re-run, re-asserting the
    /// privileges it already held.
    /// Role membership grants carry no privileges and are rejected.
    pub async fn update_privileges<S, T>(
        &self,
        grant: &Grant,
        old: &[S],
        new: &[T],
    ) -> Result<PrivilegeDiff>
    where
        S: AsRef<str>,
        T: AsRef<str>,
    {
        if grant.kind() == GrantKind::Role {
            bail!(GrantError::Unsupported(
                "role membership grants have no privileges to update".to_owned()
            ));
        }
        let diff = diff_privileges(old, new);

        if !diff.removed.is_empty() {
            let sql = grant.partial_revoke_statement(&diff.removed)?;
            self.execute(&sql).await?;
        }
        if !diff.added.is_empty() {
            self.execute(&grant.grant_statement()).await?;
        }
        Ok(diff)
    }

    /// Revoke a grant. A grant the server no longer has counts as revoked.
    pub async fn delete(&self, grant: &Grant) -> Result<()> {
        let sql = grant.revoke_statement();
        debug!("SQL: {sql}");
        match self.client.execute(&sql).await {
            Ok(()) => Ok(()),
            Err(e) if e.category().is_ignorable() => {
                info!("grant already absent, nothing to revoke ({sql}): {e}");
                Ok(())
            }
            Err(e) => Err(execution_error(&sql, e)).context("error revoking grant"),
        }
    }

    /// The first live grant the import identifier points at.
    pub async fn find_import_match(&self, id: &ImportId) -> Result<Option<Grant>> {
        let grants = self.show_grants(&id.identity()).await?;
        Ok(grants.into_iter().find(|g| id.matches(g)))
    }

    /// Read an existing grant into declared fields. `None` when nothing
    /// matches; the caller decides how to report that.
    pub async fn import(&self, id: &ImportId) -> Result<Option<DeclaredGrant>> {
        Ok(self
            .find_import_match(id)
            .await?
            .map(|g| DeclaredGrant::from_grant(&g)))
    }

    async fn execute(&self, sql: &str) -> Result<()> {
        debug!("SQL: {sql}");
        self.client
            .execute(sql)
            .await
            .map_err(|e| execution_error(sql, e).into())
    }
}

fn execution_error(sql: &str, e: DbError) -> GrantError {
    GrantError::Execution {
        statement: sql.to_owned(),
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use grantsync_core::{RoleMembershipGrant, TablePrivilegeGrant};
    use mockall::{predicate::eq, Sequence};

    use crate::client::MockGrantClient;

    const SHOW_BOB: &str = "SHOW GRANTS FOR 'bob'@'%'";
    const USAGE_ROW: &str = "GRANT USAGE ON *.* TO 'bob'@'%'";

    fn bob() -> Identity {
        Identity::user("bob", "%")
    }

    fn table_grant(privileges: &[&str], grant_option: bool) -> Grant {
        TablePrivilegeGrant {
            database: "app".to_owned(),
            table: "users".to_owned(),
            privileges: privileges.iter().map(|p| p.to_string()).collect(),
            grant_option,
            identity: bob(),
            tls_option: "NONE".to_owned(),
        }
        .into()
    }

    fn role_grant() -> Grant {
        RoleMembershipGrant {
            roles: vec!["editor".to_owned()],
            grant_option: false,
            identity: bob(),
            tls_option: "NONE".to_owned(),
        }
        .into()
    }

    fn expect_show(client: &mut MockGrantClient, rows: &[&str]) {
        let rows = rows.iter().map(|r| r.to_string()).collect::<Vec<_>>();
        client
            .expect_query()
            .with(eq(SHOW_BOB))
            .returning(move |_| Ok(rows.clone()));
    }

    fn grant_error(err: &anyhow::Error) -> Option<&GrantError> {
        err.chain().find_map(|e| e.downcast_ref::<GrantError>())
    }

    #[tokio::test]
    async fn show_grants_filters_rows() -> Result<()> {
        let mut client = MockGrantClient::new();
        expect_show(
            &mut client,
            &[
                USAGE_ROW,
                "GRANT SELECT ON `app`.`users` TO 'bob'@'%'",
                "GRANT SELECT ON `other`.* TO 'bob'@'10.0.0.1'",
                "REVOKE INSERT ON `mysql`.* FROM 'bob'@'%'",
            ],
        );
        let grants = GrantManager::new(client).show_grants(&bob()).await?;
        assert_eq!(grants.len(), 2);
        assert!(grants.iter().all(|g| g.identity() == &bob()));
        assert_eq!(grants[1].table(), Some("users"));
        Ok(())
    }

    #[tokio::test]
    async fn show_grants_for_unknown_identity_is_empty() -> Result<()> {
        let mut client = MockGrantClient::new();
        client
            .expect_query()
            .returning(|_| Err(DbError::new(1141, "There is no such grant defined")));
        let grants = GrantManager::new(client).show_grants(&bob()).await?;
        assert!(grants.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn show_grants_surfaces_other_errors() {
        let mut client = MockGrantClient::new();
        client
            .expect_query()
            .returning(|_| Err(DbError::new(1045, "Access denied")));
        let err = GrantManager::new(client)
            .show_grants(&bob())
            .await
            .unwrap_err();
        assert!(matches!(
            grant_error(&err),
            Some(GrantError::Execution { statement, .. }) if statement == SHOW_BOB
        ));
    }

    #[tokio::test]
    async fn show_grants_fails_on_unparseable_row() {
        let mut client = MockGrantClient::new();
        expect_show(&mut client, &["GRANT nonsense"]);
        let err = GrantManager::new(client)
            .show_grants(&bob())
            .await
            .unwrap_err();
        assert!(matches!(grant_error(&err), Some(GrantError::Parse { .. })));
    }

    #[tokio::test]
    async fn create_executes_grant_and_returns_id() -> Result<()> {
        let mut client = MockGrantClient::new();
        expect_show(&mut client, &[USAGE_ROW]);
        client
            .expect_execute()
            .with(eq("GRANT SELECT ON `app`.`users` TO 'bob'@'%'"))
            .times(1)
            .returning(|_| Ok(()));
        let id = GrantManager::new(client)
            .create(&table_grant(&["SELECT"], false))
            .await?;
        assert_eq!(id, "bob@%:`app`");
        Ok(())
    }

    #[tokio::test]
    async fn create_fails_on_conflicting_grant() {
        let mut client = MockGrantClient::new();
        expect_show(
            &mut client,
            &[USAGE_ROW, "GRANT SELECT ON `app`.`orders` TO 'bob'@'%'"],
        );
        client.expect_execute().never();
        let err = GrantManager::new(client)
            .create(&table_grant(&["SELECT"], false))
            .await
            .unwrap_err();
        assert_eq!(
            grant_error(&err),
            Some(&GrantError::Conflict {
                identity: "'bob'@'%'".to_owned()
            })
        );
        assert!(err.to_string().contains("import it first"));
    }

    #[tokio::test]
    async fn different_grant_option_does_not_conflict() -> Result<()> {
        let mut client = MockGrantClient::new();
        expect_show(&mut client, &["GRANT SELECT ON `app`.`orders` TO 'bob'@'%'"]);
        client.expect_execute().times(1).returning(|_| Ok(()));
        GrantManager::new(client)
            .create(&table_grant(&["SELECT"], true))
            .await?;
        Ok(())
    }

    #[tokio::test]
    async fn role_grant_needs_role_support() {
        let mut client = MockGrantClient::new();
        client.expect_supports_roles().returning(|| Ok(false));
        client.expect_execute().never();
        let err = GrantManager::new(client)
            .create(&role_grant())
            .await
            .unwrap_err();
        assert!(matches!(grant_error(&err), Some(GrantError::Unsupported(_))));
    }

    #[tokio::test]
    async fn role_grant_is_created() -> Result<()> {
        let mut client = MockGrantClient::new();
        client.expect_supports_roles().returning(|| Ok(true));
        expect_show(
            &mut client,
            &[USAGE_ROW, "GRANT SELECT ON `app`.* TO 'bob'@'%'"],
        );
        client
            .expect_execute()
            .with(eq("GRANT editor TO 'bob'@'%'"))
            .times(1)
            .returning(|_| Ok(()));
        let id = GrantManager::new(client).create(&role_grant()).await?;
        assert_eq!(id, "bob@%");
        Ok(())
    }

    #[tokio::test]
    async fn update_revokes_removed_then_grants_all() -> Result<()> {
        let mut client = MockGrantClient::new();
        let mut seq = Sequence::new();
        client
            .expect_execute()
            .with(eq("REVOKE INSERT ON `app`.`users` FROM 'bob'@'%'"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        client
            .expect_execute()
            .with(eq("GRANT SELECT, UPDATE ON `app`.`users` TO 'bob'@'%'"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let diff = GrantManager::new(client)
            .update_privileges(
                &table_grant(&["SELECT", "UPDATE"], false),
                &["SELECT", "INSERT"],
                &["SELECT", "UPDATE"],
            )
            .await?;
        assert_eq!(diff.removed, vec!["INSERT"]);
        assert_eq!(diff.added, vec!["UPDATE"]);
        Ok(())
    }

    #[tokio::test]
    async fn update_with_only_removals_skips_grant() -> Result<()> {
        let mut client = MockGrantClient::new();
        client
            .expect_execute()
            .with(eq("REVOKE INSERT ON `app`.`users` FROM 'bob'@'%'"))
            .times(1)
            .returning(|_| Ok(()));
        GrantManager::new(client)
            .update_privileges(
                &table_grant(&["SELECT"], false),
                &["SELECT", "INSERT"],
                &["SELECT"],
            )
            .await?;
        Ok(())
    }

    #[tokio::test]
    async fn update_without_changes_does_nothing() -> Result<()> {
        let mut client = MockGrantClient::new();
        client.expect_execute().never();
        let diff = GrantManager::new(client)
            .update_privileges(
                &table_grant(&["SELECT"], false),
                &["select"],
                &["SELECT"],
            )
            .await?;
        assert!(diff.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn role_grants_cannot_partially_revoke() {
        let mut client = MockGrantClient::new();
        client.expect_execute().never();
        let err = GrantManager::new(client)
            .update_privileges(&role_grant(), &["SELECT"], &[] as &[&str])
            .await
            .unwrap_err();
        assert!(matches!(grant_error(&err), Some(GrantError::Unsupported(_))));
    }

    #[tokio::test]
    async fn role_grants_cannot_gain_privileges() {
        let mut client = MockGrantClient::new();
        client.expect_execute().never();
        let err = GrantManager::new(client)
            .update_privileges(&role_grant(), &[] as &[&str], &["SELECT"])
            .await
            .unwrap_err();
        assert!(matches!(grant_error(&err), Some(GrantError::Unsupported(_))));
    }

    #[tokio::test]
    async fn update_failure_carries_statement() {
        let mut client = MockGrantClient::new();
        client
            .expect_execute()
            .returning(|_| Err(DbError::new(1044, "Access denied")));
        let err = GrantManager::new(client)
            .update_privileges(&table_grant(&["SELECT", "UPDATE"], false), &["SELECT"], &["SELECT", "UPDATE"])
            .await
            .unwrap_err();
        assert!(err
            .to_string()
            .contains("GRANT SELECT, UPDATE ON `app`.`users` TO 'bob'@'%'"));
    }

    #[tokio::test]
    async fn delete_of_absent_grant_succeeds() -> Result<()> {
        let mut client = MockGrantClient::new();
        client
            .expect_execute()
            .with(eq("REVOKE SELECT ON `app`.`users` FROM 'bob'@'%'"))
            .times(1)
            .returning(|_| Err(DbError::new(1147, "There is no such grant defined")));
        GrantManager::new(client)
            .delete(&table_grant(&["SELECT"], false))
            .await?;
        Ok(())
    }

    #[tokio::test]
    async fn delete_surfaces_other_errors() {
        let mut client = MockGrantClient::new();
        client
            .expect_execute()
            .returning(|_| Err(DbError::other("connection reset")));
        let err = GrantManager::new(client)
            .delete(&table_grant(&["SELECT"], false))
            .await
            .unwrap_err();
        assert!(matches!(
            grant_error(&err),
            Some(GrantError::Execution { .. })
        ));
    }

    #[tokio::test]
    async fn read_drops_grant_when_identity_has_none() -> Result<()> {
        let mut client = MockGrantClient::new();
        client
            .expect_query()
            .returning(|_| Err(DbError::new(1141, "There is no such grant defined")));
        let read = GrantManager::new(client)
            .read(&table_grant(&["SELECT"], false))
            .await?;
        assert_eq!(read, None);
        Ok(())
    }

    #[tokio::test]
    async fn read_keeps_declared_grant() -> Result<()> {
        let mut client = MockGrantClient::new();
        expect_show(&mut client, &[USAGE_ROW]);
        let grant = table_grant(&["SELECT"], false);
        let read = GrantManager::new(client).read(&grant).await?;
        assert_eq!(read, Some(grant));
        Ok(())
    }

    #[tokio::test]
    async fn import_matches_database_table_and_flag() -> Result<()> {
        let mut client = MockGrantClient::new();
        expect_show(
            &mut client,
            &[
                USAGE_ROW,
                "GRANT SELECT ON `app`.`users` TO 'bob'@'%' WITH GRANT OPTION",
                "GRANT SELECT, INSERT ON `app`.`orders` TO 'bob'@'%'",
                "GRANT SELECT, INSERT ON `app`.`users` TO 'bob'@'%'",
            ],
        );
        let declared = GrantManager::new(client)
            .import(&"bob@%@app@users".parse()?)
            .await?
            .expect("grant should match");
        assert_eq!(declared.user, Some("bob".to_owned()));
        assert_eq!(declared.host, "%");
        assert_eq!(declared.database, "app");
        assert_eq!(declared.table, "users");
        assert_eq!(declared.privileges, vec!["SELECT", "INSERT"]);
        assert!(!declared.grant);
        Ok(())
    }

    #[tokio::test]
    async fn import_without_match_is_empty() -> Result<()> {
        let mut client = MockGrantClient::new();
        expect_show(
            &mut client,
            &[USAGE_ROW, "GRANT SELECT ON `app`.`orders` TO 'bob'@'%'"],
        );
        let found = GrantManager::new(client)
            .import(&"bob@%@app@users@".parse()?)
            .await?;
        assert_eq!(found, None);
        Ok(())
    }
}
