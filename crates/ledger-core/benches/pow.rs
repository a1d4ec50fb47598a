use criterion::{criterion_group, criterion_main, Criterion};
use ledger_core::{mine::mine_block, Block, BlockData, LedgerConfig, Transaction, Wallet};

fn bench_pow(c: &mut Criterion) {
    c.bench_function("mine_block_ten_transfers", |b| {
        let config = LedgerConfig::default();
        let sender = Wallet::new(config.initial_balance);
        let txs: Vec<Transaction> = (0..10)
            .map(|i| Transaction::new_transaction(&sender, &format!("bob-{i}"), i).unwrap())
            .collect();
        let data = BlockData::from(txs);
        let genesis = Block::genesis(config.difficulty);

        // Genesis is stamped at the epoch, so every block retargets to difficulty - 1.
        b.iter(|| {
            let _mined = mine_block(&genesis, data.clone(), config.mine_rate_ms);
        });
    });
}

criterion_group!(benches, bench_pow);
criterion_main!(benches);
