impl Mapper {
    /// Loads the instance stored under `id`, following its relations.
    ///
    /// Returns `None` when no primary row exists. The returned [`Tracked`]
    /// remembers the loaded state so a later [`Mapper::update`] writes only
    /// what changed.
    pub async fn read<E: Entity>(&self, id: Uuid) -> Result<Option<Tracked<E>>> {
        let schema = self.schema::<E>()?;
        let span = info_span!("cassmap.read", entity = schema.type_name(), %id);
        async {
            let mut trail = ReadTrail::new(self.config.max_relation_depth);
            let Some(entity) = self.load_entity(&schema, id, &mut trail).await? else {
                event!(Level::DEBUG, table = schema.table_name(), "no row for id");
                return Ok(None);
            };
            self.track(&schema, entity, id).map(Some)
        }
        .instrument(span)
        .await
    }

    /// Looks the id up in the column's index table, then reads that entity.
    ///
    /// A missing index entry yields `None` without reading the primary table.
    pub async fn read_by_index<E: Entity, V: ColumnType>(
        &self,
        column: &str,
        value: V,
    ) -> Result<Option<Tracked<E>>> {
        let schema = self.schema::<E>()?;
        let span = info_span!("cassmap.read_by_index", entity = schema.type_name(), column);
        async {
            let descriptor = schema.column(column).filter(|descriptor| descriptor.is_indexed());
            let Some((descriptor, index_table)) =
                descriptor.and_then(|descriptor| Some((descriptor, descriptor.index_table()?)))
            else {
                return Err(MapperError::NotIndexed {
                    table: schema.table_name().to_string(),
                    column: column.to_string(),
                });
            };
            if V::KIND != descriptor.kind() {
                return Err(MapperError::UnsupportedType {
                    column: column.to_string(),
                    expected: descriptor.kind(),
                    found: V::KIND.cql_type(),
                });
            }

            let value = value.encode()?;
            if value.is_null() {
                // null values are never indexed
                return Ok(None);
            }

            let owner_column = schema.owner_column();
            let select = Select::from(index_table)
                .column(owner_column.as_str())
                .where_eq(descriptor.name(), value);
            let rows = self.query(select).await?;
            let Some(row) = single_row(index_table, rows)? else {
                event!(Level::DEBUG, index_table, "index miss");
                return Ok(None);
            };
            let Some(id) = row.get(&owner_column).and_then(Value::as_uuid) else {
                event!(Level::WARN, index_table, "index row has no owner id");
                return Ok(None);
            };
            self.read::<E>(id).await
        }
        .instrument(span)
        .await
    }

    /// Loads a related entity one level further down `trail`.
    #[async_recursion]
    pub(crate) async fn read_related<R: Entity>(
        &self,
        id: Uuid,
        trail: &mut ReadTrail,
    ) -> Result<Option<R>> {
        let schema = self.schema::<R>()?;
        self.load_entity(&schema, id, trail).await
    }

    async fn load_entity<E: Entity>(
        &self,
        schema: &Schema<E>,
        id: Uuid,
        trail: &mut ReadTrail,
    ) -> Result<Option<E>> {
        trail.enter(schema.table_name(), id)?;
        let loaded = self.load_rows(schema, id, trail).await;
        trail.leave();
        loaded
    }

    async fn load_rows<E: Entity>(
        &self,
        schema: &Schema<E>,
        id: Uuid,
        trail: &mut ReadTrail,
    ) -> Result<Option<E>> {
        let select = Select::from(schema.table_name()).where_eq(schema.id_name(), Value::Uuid(id));
        let rows = self.query(select).await?;
        let Some(mut row) = single_row(schema.table_name(), rows)? else {
            return Ok(None);
        };

        let mut entity = schema.instantiate();
        schema.set_id(&mut entity, id)?;
        for column in schema.columns() {
            column.set(&mut entity, row.take(column.name()))?;
        }

        for relation in schema.relations() {
            let select = Select::from(relation.join_table())
                .column(relation.target_column())
                .where_eq(relation.owner_column(), Value::Uuid(id));
            let related = self
                .query(select)
                .await?
                .iter()
                .filter_map(|row| row.get(relation.target_column()).and_then(Value::as_uuid))
                .collect();
            relation.link().load(self, &mut entity, related, trail).await?;
        }
        Ok(Some(entity))
    }
}
