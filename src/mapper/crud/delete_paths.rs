impl Mapper {
    /// Removes a tracked instance and forgets its remembered state.
    pub async fn delete<E: Entity>(&self, entity: &Tracked<E>) -> Result<()> {
        self.delete_entity(entity.entity()).await?;
        self.cache.evict(entity.handle())?;
        Ok(())
    }

    /// Removes an instance that was never read through this mapper.
    pub async fn delete_detached<E: Entity>(&self, entity: &E) -> Result<()> {
        self.delete_entity(entity).await
    }

    /// Primary row, the index rows of current non-null indexed values, and
    /// every join row owned by the instance. Related entities stay.
    async fn delete_entity<E: Entity>(&self, entity: &E) -> Result<()> {
        let schema = self.schema::<E>()?;
        let id = schema.id_value(entity)?.ok_or_else(|| {
            MapperError::Precondition(format!(
                "{} has no {}; delete needs a persisted instance",
                schema.type_name(),
                schema.id_name()
            ))
        })?;
        let span = info_span!("cassmap.delete", entity = schema.type_name(), %id);
        async {
            let mut batch = Batch::new();
            batch.add(Delete::from(schema.table_name()).where_eq(schema.id_name(), Value::Uuid(id)));
            for column in schema.indexed_columns() {
                let value = column.get(entity)?;
                if let Some(index_table) = column.index_table()
                    && !value.is_null()
                {
                    batch.add(Delete::from(index_table).where_eq(column.name(), value));
                }
            }
            for relation in schema.relations() {
                batch.add(
                    Delete::from(relation.join_table())
                        .where_eq(relation.owner_column(), Value::Uuid(id)),
                );
            }

            self.submit("delete", batch).await?;
            event!(Level::INFO, table = schema.table_name(), "entity deleted");
            Ok(())
        }
        .instrument(span)
        .await
    }
}
