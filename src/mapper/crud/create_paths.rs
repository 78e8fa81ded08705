impl Mapper {
    /// Persists a new instance and writes the generated id back into it.
    ///
    /// The primary row, one row per non-null indexed column and one join row
    /// per related element go out as a single batch. Fails without touching
    /// storage when the identity is already set or a related element has no
    /// id yet.
    pub async fn create<E: Entity>(&self, entity: &mut E) -> Result<Uuid> {
        let schema = self.schema::<E>()?;
        let span = info_span!("cassmap.create", entity = schema.type_name());
        async {
            if let Some(existing) = schema.id_value(entity)? {
                return Err(MapperError::Precondition(format!(
                    "{} already has {} = {existing}; create only accepts new instances",
                    schema.type_name(),
                    schema.id_name()
                )));
            }

            let id = Uuid::new_v4();
            let batch = self.create_batch(&schema, entity, id)?;
            self.submit("create", batch).await?;
            schema.set_id(entity, id)?;

            event!(Level::INFO, %id, table = schema.table_name(), "entity created");
            Ok(id)
        }
        .instrument(span)
        .await
    }

    fn create_batch<E: Entity>(&self, schema: &Schema<E>, entity: &E, id: Uuid) -> Result<Batch> {
        let mut batch = Batch::new();
        let owner_column = schema.owner_column();

        let mut primary = Insert::into(schema.table_name()).value(schema.id_name(), Value::Uuid(id));
        for column in schema.columns() {
            let value = column.get(entity)?;
            if let Some(index_table) = column.index_table()
                && !value.is_null()
            {
                batch.add(
                    Insert::into(index_table)
                        .value(column.name(), value.clone())
                        .value(owner_column.as_str(), Value::Uuid(id)),
                );
            }
            primary = primary.value(column.name(), value);
        }
        batch.add(primary);

        for relation in schema.relations() {
            for related in distinct(&self.relation_ids(relation, entity)?) {
                batch.add(
                    Insert::into(relation.join_table())
                        .value(relation.owner_column(), Value::Uuid(id))
                        .value(relation.target_column(), Value::Uuid(related)),
                );
            }
        }
        Ok(batch)
    }
}
