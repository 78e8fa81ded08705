impl Mapper {
    /// Writes the changes made to a tracked instance since it was read.
    ///
    /// Only columns whose value is non-null and differs from the loaded one are
    /// sent, together with their index rows. Join rows are added and removed
    /// by diffing related ids. When nothing changed no batch is sent. The
    /// remembered state is not refreshed afterwards.
    pub async fn update<E: Entity>(&self, entity: &Tracked<E>) -> Result<()> {
        let record = self.cache.get(entity.handle())?;
        self.update_entity(entity.entity(), record).await
    }

    /// Writes every column of an instance that was never read through this
    /// mapper, rewriting all of its non-null index entries.
    pub async fn update_detached<E: Entity>(&self, entity: &E) -> Result<()> {
        self.update_entity(entity, None).await
    }

    async fn update_entity<E: Entity>(&self, entity: &E, record: Option<Record>) -> Result<()> {
        let schema = self.schema::<E>()?;
        let id = schema.id_value(entity)?.ok_or_else(|| {
            MapperError::Precondition(format!(
                "{} has no {}; update needs a persisted instance",
                schema.type_name(),
                schema.id_name()
            ))
        })?;
        let span = info_span!(
            "cassmap.update",
            entity = schema.type_name(),
            %id,
            tracked = record.is_some()
        );
        async {
            let batch = self.update_batch(&schema, entity, id, record.as_ref())?;
            let statements = batch.len();
            self.submit("update", batch).await?;
            event!(Level::INFO, statements, "entity updated");
            Ok(())
        }
        .instrument(span)
        .await
    }

    fn update_batch<E: Entity>(
        &self,
        schema: &Schema<E>,
        entity: &E,
        id: Uuid,
        record: Option<&Record>,
    ) -> Result<Batch> {
        let mut batch = Batch::new();
        let owner_column = schema.owner_column();
        let mut primary = Update::table(schema.table_name());

        for column in schema.columns() {
            let current = column.get(entity)?;
            match record {
                Some(record) => {
                    let previous = record.column(column.name()).unwrap_or(&Value::Null);
                    if current.is_null() || &current == previous {
                        continue;
                    }
                    if let Some(index_table) = column.index_table() {
                        if !previous.is_null() {
                            batch.add(
                                Delete::from(index_table).where_eq(column.name(), previous.clone()),
                            );
                        }
                        batch.add(
                            Insert::into(index_table)
                                .value(column.name(), current.clone())
                                .value(owner_column.as_str(), Value::Uuid(id)),
                        );
                    }
                }
                None => {
                    if let Some(index_table) = column.index_table()
                        && !current.is_null()
                    {
                        batch.add(
                            Insert::into(index_table)
                                .value(column.name(), current.clone())
                                .value(owner_column.as_str(), Value::Uuid(id)),
                        );
                    }
                }
            }
            primary = primary.set(column.name(), current);
        }
        if primary.has_assignments() {
            batch.add(primary.where_eq(schema.id_name(), Value::Uuid(id)));
        }

        for relation in schema.relations() {
            let current = distinct(&self.relation_ids(relation, entity)?);
            let previous = record
                .map(|record| distinct(record.relation(relation.field())))
                .unwrap_or_default();
            let current_set: HashSet<Uuid> = current.iter().copied().collect();
            let previous_set: HashSet<Uuid> = previous.iter().copied().collect();

            for related in current.iter().filter(|related| !previous_set.contains(related)) {
                batch.add(
                    Insert::into(relation.join_table())
                        .value(relation.owner_column(), Value::Uuid(id))
                        .value(relation.target_column(), Value::Uuid(*related)),
                );
            }
            for related in previous.iter().filter(|related| !current_set.contains(related)) {
                batch.add(
                    Delete::from(relation.join_table())
                        .where_eq(relation.owner_column(), Value::Uuid(id))
                        .where_eq(relation.target_column(), Value::Uuid(*related)),
                );
            }
        }
        Ok(batch)
    }
}
