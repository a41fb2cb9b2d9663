//! Backtest command implementation

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use orb_backtest::backtest::{BacktestReport, Backtester, PolicyReport};
use orb_backtest::options::parse_policy_list;
use orb_backtest::{data, export, strategies, Config};
use tracing::info;

pub struct BacktestArgs {
    pub config_path: String,
    pub data_override: Option<String>,
    pub lot_size_override: Option<u32>,
    pub expiry_override: Option<String>,
    pub strikes_override: Option<String>,
    pub export_dir: Option<String>,
    pub last_trades: usize,
    pub sequential: bool,
}

pub fn run(args: BacktestArgs) -> Result<()> {
    info!("Starting backtest");

    // Load configuration
    let mut config = Config::from_file(&args.config_path)?;
    info!("Loaded configuration from: {}", args.config_path);

    // Apply overrides
    if let Some(data) = args.data_override {
        info!("Overriding data path to: {}", data);
        config.backtest.data_path = data;
    }

    if let Some(lot_size) = args.lot_size_override {
        info!("Overriding lot size to: {}", lot_size);
        config.options.lot_size = lot_size;
    }

    if let Some(expiry) = args.expiry_override {
        config.options.expiry_policy = expiry.parse()?;
        info!("Overriding expiry policy to: {}", config.options.expiry_policy);
    }

    if let Some(strikes) = args.strikes_override {
        config.options.strike_policies = parse_policy_list(&strikes)?;
        info!("Overriding strike policies to: {:?}", config.options.strike_policies);
    }

    if args.sequential {
        config.backtest.parallel = false;
    }

    config.validate()?;

    // Load data
    info!("Loading data from: {}", config.backtest.data_path);
    let days = data::load_trading_days(&config.backtest.data_path, &config.session)?;

    let strategy = strategies::create(&config)?;
    let backtester = Backtester::new(&config, strategy)?;

    println!("{}", "=".repeat(80));
    println!("        BANK NIFTY OPTIONS - OPENING BAR BREAKOUT BACKTEST");
    println!(
        "              Expiry: {} | Lot Size: {}",
        config.options.expiry_policy, config.options.lot_size
    );
    println!("{}", "=".repeat(80));

    let pb = ProgressBar::new(days.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("⚡ {percent:>3}%|{bar:40}| {pos}/{len} days [{elapsed}<{eta}]")?
            .progress_chars("█░ "),
    );
    let report = backtester.run_with_progress(&days, &pb)?;
    pb.finish_and_clear();

    print_breakout_summary(&report);
    print_policy_stats(&report);
    print_comparison(&report);

    if let Some(best) = report.best_policy() {
        print_best(best, args.last_trades);
    }

    if let Some(dir) = args.export_dir {
        let written = export::export_report(&dir, &report)?;
        println!("\nExported {} files to {}", written.len(), dir);
    }

    println!("\n{}", "=".repeat(80));
    println!("NOTE: Premiums are simulated with a delta/gamma/theta model, not market prices.");
    println!("Use the comparison for relative policy ranking, not exact P&L prediction.");
    println!("{}", "=".repeat(80));

    info!("Backtest completed successfully");

    Ok(())
}

fn share(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

fn print_breakout_summary(report: &BacktestReport) {
    let total = report.day_records.len();
    let breakouts = report.breakout_days();

    println!("\nTotal trading days: {}", total);
    println!(
        "   Breakout days: {} ({:.1}%)",
        breakouts,
        share(breakouts, total)
    );
    println!("   - CE (Bullish): {} days", report.ce_days());
    println!("   - PE (Bearish): {} days", report.pe_days());
    println!("   - No Breakout:  {} days", report.no_breakout_days());
    if !report.skipped_days.is_empty() {
        println!("   - Skipped (too few bars): {} days", report.skipped_days.len());
    }
}

fn print_policy_stats(report: &BacktestReport) {
    println!("\n{}", "=".repeat(80));
    println!("STRATEGY COMPARISON");
    println!("{}", "=".repeat(80));

    for policy in &report.policies {
        let s = &policy.summary;
        println!("\n{} ({})", s.policy, s.policy.description());
        println!("   Total Trades:   {}", s.total_trades);
        println!("   Win Rate:       {:.1}%", s.win_rate);
        println!("   Exit Breakdown:");
        println!("     - Target Hit: {} ({:.1}%)", s.target_hits, s.target_hit_rate);
        println!("     - Stop Loss:  {} ({:.1}%)", s.sl_hits, s.sl_hit_rate);
        println!("     - EOD Exit:   {} ({:.1}%)", s.eod_exits, s.eod_exit_rate);
        println!("   Total P&L:      ₹{:.2}", s.total_pnl.to_f64());
        println!("   Avg P&L/Trade:  ₹{:.2}", s.avg_pnl.to_f64());
        println!("   Max Profit:     ₹{:.2}", s.max_profit.to_f64());
        println!("   Max Loss:       ₹{:.2}", s.max_loss.to_f64());
    }
}

fn print_comparison(report: &BacktestReport) {
    println!("\n{}", "=".repeat(80));
    println!("SUMMARY COMPARISON");
    println!("{}", "=".repeat(80));
    println!(
        "{:<12} {:<8} {:<8} {:<15} {:<12}",
        "Strategy", "Trades", "Win%", "Total P&L", "Avg P&L"
    );
    println!("{}", "-".repeat(80));
    for policy in &report.policies {
        let s = &policy.summary;
        println!(
            "{:<12} {:<8} {:<8.1} ₹{:<14.2} ₹{:<11.2}",
            s.policy.as_str(),
            s.total_trades,
            s.win_rate,
            s.total_pnl.to_f64(),
            s.avg_pnl.to_f64()
        );
    }
}

fn print_best(best: &PolicyReport, last: usize) {
    println!("\nBEST STRATEGY: {}", best.policy);
    println!("   Total P&L: ₹{:.2}", best.summary.total_pnl.to_f64());
    println!("   Win Rate:  {:.1}%", best.summary.win_rate);

    if last == 0 || best.trades.is_empty() {
        return;
    }

    println!("\nLAST {} TRADES ({}) - WITH DELTA TRACKING:", last, best.policy);
    println!("{}", "-".repeat(120));
    println!(
        "{:<11} {:<4} {:<8} {:<4} {:<9} {:<9} {:<8} {:<8} {:<7} {:<8} {:<10} {:>12}",
        "Date", "Sig", "Strike", "DTE", "Entry₹", "Exit₹", "δ Entry", "δ Exit", "Gamma", "Theta₹", "Exit", "P&L"
    );
    println!("{}", "-".repeat(120));

    let skip = best.trades.len().saturating_sub(last);
    for trade in &best.trades[skip..] {
        println!(
            "{:<11} {:<4} {:<8.0} {:<4} ₹{:<8.0} ₹{:<8.0} {:<8.3} {:<8.3} {:<7.4} ₹{:<7.0} {:<10} ₹{:>+9.0} ({:+.1}%)",
            trade.date.format("%Y-%m-%d"),
            trade.option_type,
            trade.selected_strike,
            trade.days_to_expiry,
            trade.entry_premium,
            trade.exit_premium,
            trade.entry_delta,
            trade.exit_delta,
            trade.gamma,
            trade.theta_decay,
            trade.exit_reason,
            trade.total_profit.to_f64(),
            trade.profit_pct
        );
    }
}
