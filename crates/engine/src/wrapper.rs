// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ForgeDB

use std::{
	collections::{HashMap, HashSet},
	sync::Arc,
	time::Instant,
};

use forgedb_storage::Table;
use forgedb_transaction::TransactionContext;
use forgedb_type::{ChunkId, ColumnId, Params};
use tracing::{debug, instrument, warn};

use crate::{
	EngineError,
	config::ExecutionConfig,
	context::RuntimeContext,
	metrics::Metrics,
	operators::{JitOperator, OperatorChain, ReadValue},
	reader::SegmentReader,
	specialize::{CodeGenerator, READ_TUPLES_ENTRY, SpecializedFunction, interpreted_entry},
	tuple::TupleSlot,
};

/// Result of executing a fused chain: the output table plus the
/// execution's timing metrics.
#[derive(Debug)]
pub struct ExecutionOutput {
	pub table: Table,
	pub metrics: Metrics,
}

/// Owns a fused operator chain and runs it over an input table: sizes
/// the tuple, binds chunks, dispatches between the specialized and the
/// interpreted per-tuple loop, and drives the sink's lifecycle.
///
/// Deep copies share the chain and the cached execute function, so a
/// plan that is copied per execution still specializes only once.
pub struct JitOperatorWrapper {
	shared: Arc<SpecializedFunction>,
	config: ExecutionConfig,
	codegen: Arc<dyn CodeGenerator>,
	parameters: Params,
}

impl JitOperatorWrapper {
	pub fn new(chain: OperatorChain, config: ExecutionConfig, codegen: Arc<dyn CodeGenerator>) -> Self {
		Self { shared: Arc::new(SpecializedFunction::new(chain)), config, codegen, parameters: Params::empty() }
	}

	/// A copy sharing the chain and the specialized-function cache.
	pub fn deep_copy(&self) -> Self {
		Self {
			shared: Arc::clone(&self.shared),
			config: self.config,
			codegen: Arc::clone(&self.codegen),
			parameters: self.parameters.clone(),
		}
	}

	pub fn config(&self) -> ExecutionConfig {
		self.config
	}

	/// Bind prepared-statement parameter values. Non-value-id parameter
	/// slots are materialized at `before_query`; value-id parameters are
	/// resolved per chunk like literals.
	pub fn set_parameters(&mut self, parameters: Params) {
		self.parameters = parameters;
	}

	pub fn description(&self) -> String {
		let chain = self.shared.chain.read();
		let mut parts = vec!["[JitOperatorWrapper]".to_string()];
		parts.extend(chain.descriptions());
		parts.join(" ")
	}

	/// Inspect the chain (for diagnostics and tests).
	pub fn with_chain<R>(&self, inspect: impl FnOnce(&OperatorChain) -> R) -> R {
		inspect(&self.shared.chain.read())
	}

	pub fn specialization_passes(&self) -> usize {
		self.shared.passes()
	}

	/// One-time preparation, shared between deep copies: resolve the
	/// validate operator's input kind, record the baseline reader types,
	/// insert lazy loads, and choose the execute function.
	#[instrument(name = "jit::wrapper::prepare", level = "trace", skip_all)]
	fn prepare(&self, in_table: &Table) -> crate::Result<()> {
		let _guard = self.shared.prepare_lock.lock();
		if self.shared.function.get().is_some() {
			return Ok(());
		}

		let two_passes;
		{
			let mut chain = self.shared.chain.write();
			for op in &mut chain.ops {
				if let JitOperator::Validate(validate) = op {
					validate.set_input_kind(in_table.kind());
				}
			}
			let baseline = if in_table.chunk_count() > 0 {
				let readers = chain.source().build_readers(in_table.chunk(ChunkId(0))?)?;
				Some(readers.iter().map(SegmentReader::kind).collect())
			} else {
				None
			};
			chain.source_mut().set_baseline_kinds(baseline);
			chain.source_mut().set_lazy(self.config.lazy_load);
			if self.config.lazy_load && !chain.loads_inserted {
				insert_loads(&mut chain);
			}
			chain.loads_inserted = true;
			two_passes = matches!(chain.sink(), JitOperator::Aggregate(_));
			debug!(chain = %chain.descriptions().join(" "), "prepared fused chain");
		}

		let passes = if two_passes { 2 } else { 1 };
		let function: crate::ExecuteFn = if self.config.interpret {
			interpreted_entry
		} else {
			let chain = self.shared.chain.read();
			self.codegen.specialize(READ_TUPLES_ENTRY, &chain, passes).unwrap_or(interpreted_entry)
		};
		self.shared.record_passes(passes);
		let _ = self.shared.function.set(function);
		Ok(())
	}

	/// Run the chain over `in_table` under `tx`'s snapshot. An already
	/// aborted transaction yields an empty output immediately.
	#[instrument(name = "jit::wrapper::execute", level = "trace", skip_all)]
	pub fn execute(&self, in_table: &Arc<Table>, tx: &TransactionContext) -> crate::Result<ExecutionOutput> {
		if tx.is_aborted() {
			let chain = self.shared.chain.read();
			return Ok(ExecutionOutput {
				table: chain.sink_create_output_table(in_table),
				metrics: Metrics::default(),
			});
		}

		self.prepare(in_table)?;
		let chain = self.shared.chain.read();
		let function = *self
			.shared
			.function
			.get()
			.ok_or_else(|| EngineError::invalid_plan("wrapper executed before preparation"))?;

		tx.on_operator_started("JitOperatorWrapper");
		let mut ctx = RuntimeContext::new(tx.own_tid(), tx.snapshot_cid(), self.config.measure);
		let mut out_table = chain.sink_create_output_table(in_table);

		let mut timer = Instant::now();
		chain.source().before_query(&self.parameters, &mut ctx)?;
		chain.sink_before_query(&mut ctx);
		ctx.metrics.before_query = timer.elapsed();

		for chunk_index in 0..in_table.chunk_count() {
			if ctx.remaining_rows == 0 {
				break;
			}
			let chunk_id = ChunkId(chunk_index as u32);
			timer = Instant::now();
			let same_type = chain.source().before_chunk(in_table, chunk_id, &self.parameters, &mut ctx)?;
			ctx.metrics.before_chunk += timer.elapsed();

			timer = Instant::now();
			if same_type {
				function(&chain, &mut ctx)?;
			} else {
				warn!(%chunk_id, "reader types changed, interpreting this chunk");
				chain.execute(&mut ctx)?;
			}
			ctx.metrics.function += timer.elapsed();

			timer = Instant::now();
			chain.sink_after_chunk(in_table, &mut out_table, &mut ctx)?;
			ctx.metrics.after_chunk += timer.elapsed();
		}

		timer = Instant::now();
		chain.sink_after_query(&mut out_table, &mut ctx)?;
		ctx.metrics.after_query = timer.elapsed();
		ctx.mvcc = None;
		tx.on_operator_finished("JitOperatorWrapper");

		Ok(ExecutionOutput { table: out_table, metrics: ctx.metrics })
	}
}

/// Rewrite the chain so every input column is loaded as late as
/// possible: a slot read by exactly one compute or filter is loaded
/// inside that operator; every other slot gets an explicit read-value
/// operator right before its first reader.
fn insert_loads(chain: &mut OperatorChain) {
	let inputs: Vec<(usize, ColumnId, TupleSlot)> = chain
		.source()
		.input_columns()
		.iter()
		.map(|column| (column.slot.index(), column.column_id, column.slot))
		.collect();
	let input_by_slot: HashMap<usize, usize> =
		inputs.iter().enumerate().map(|(index, (slot, _, _))| (*slot, index)).collect();

	let reads: Vec<Vec<(usize, bool)>> =
		chain.ops.iter().map(|op| op.accessed_slots(&chain.expressions)).collect();
	let mut consumers: HashMap<usize, usize> = HashMap::new();
	for op_reads in &reads {
		for (slot, _) in op_reads {
			if input_by_slot.contains_key(slot) {
				*consumers.entry(*slot).or_default() += 1;
			}
		}
	}

	let mut handled: HashSet<usize> = HashSet::new();
	let old_ops = std::mem::take(&mut chain.ops);
	let mut new_ops = Vec::with_capacity(old_ops.len() + inputs.len());
	for (op_index, mut op) in old_ops.into_iter().enumerate() {
		if op_index == 0 {
			new_ops.push(op);
			continue;
		}
		for (slot, embeddable) in &reads[op_index] {
			let Some(&input_index) = input_by_slot.get(slot) else {
				continue;
			};
			if !handled.insert(*slot) {
				continue;
			}
			let embed = *embeddable && consumers.get(slot).copied().unwrap_or_default() == 1;
			match (&mut op, embed) {
				(JitOperator::Compute(compute), true) => {
					let expression = compute.expression();
					chain.expressions.embed_load(expression, *slot, input_index);
				}
				(JitOperator::Filter(filter), true) => filter.set_load(input_index),
				_ => {
					let (_, column_id, tuple_slot) = inputs[input_index];
					new_ops.push(JitOperator::ReadValue(ReadValue::new(
						column_id, tuple_slot, input_index,
					)));
				}
			}
		}
		new_ops.push(op);
	}
	chain.ops = new_ops;
}
