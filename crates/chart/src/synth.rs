use std::collections::BTreeSet;
use tracing::debug;
use tracker_core::chart::entity::{
    BarGains, BarValues, ChartDataset, Gain, HighlightMarker, Polarity, ReferenceKind,
    ReferenceMarker, ThresholdMarker, ThresholdStyle,
};
use tracker_core::chart::error::ChartError;
use tracker_core::common::compact_date;
use tracker_core::market::entity::{PriceField, RawBar};
use tracker_core::watchlist::entity::Observation;

/// 1% 位置相对参考价位 2 的倍数。
const THRESHOLD_FACTOR: f64 = 1.01;

/// 四舍五入到指定位数的小数，并消除 `-0.0`。
fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor + 0.0
}

/// 相对基准价的涨幅百分比，保留 2 位小数。
pub fn gain(price: f64, base: f64) -> Gain {
    let percent = round_to((price - base) / base * 100.0, 2);
    let polarity = if percent >= 0.0 {
        Polarity::Up
    } else {
        Polarity::Down
    };
    Gain { percent, polarity }
}

/// 参考价位 2 上浮 1% 的价格，保留 3 位小数。
pub fn projected_price(high_reference: f64) -> f64 {
    round_to(high_reference * THRESHOLD_FACTOR, 3)
}

fn parse_field(bar: &RawBar, field: &PriceField, name: &str) -> Result<f64, ChartError> {
    field.value().ok_or_else(|| ChartError::MalformedBar {
        trade_date: bar.trade_date.clone(),
        field: name.to_string(),
    })
}

fn parse_bar(bar: &RawBar) -> Result<BarValues, ChartError> {
    Ok([
        parse_field(bar, &bar.open, "open")?,
        parse_field(bar, &bar.close, "close")?,
        parse_field(bar, &bar.low, "low")?,
        parse_field(bar, &bar.high, "high")?,
    ])
}

/// # Summary
/// 由行情序列、观察记录与高亮集合合成图表数据。
///
/// # Invariants
/// - 纯函数：相同输入必然得到相同输出，不做任何 I/O。
/// - 任意一根 K 线价格无效即整体失败，不返回部分结果。
///
/// # Logic
/// 1. 解析每根 K 线的四个价格，得到并行的 `dates` / `bars`。
/// 2. 在 `dates` 中定位观察日 (紧凑格式)；找不到时省略与之相关的标记。
/// 3. 观察日上放置两个参考价位标记。
/// 4. 观察日之后还有交易日时，在次一交易日放置 1% 位置标记，
///    次日收盘价不低于该价格为 `Reached`，否则为 `Missed`。
/// 5. 按日期顺序为每个存在于序列中的高亮日期放置最高价标记，未知日期忽略。
/// 6. 所有涨幅均相对参考价位 2 计算。
///
/// # Arguments
/// * `history`: 按交易日升序排列的行情序列。
/// * `observation`: 观察记录。
/// * `highlights`: 紧凑格式的高亮交易日集合。
///
/// # Returns
/// 成功返回 `ChartDataset`，价格无法解析时返回 `ChartError::MalformedBar`。
pub fn synthesize(
    history: &[RawBar],
    observation: &Observation,
    highlights: &BTreeSet<String>,
) -> Result<ChartDataset, ChartError> {
    let base = observation.reference_prices.high;

    let bars = history.iter().map(parse_bar).collect::<Result<Vec<_>, _>>()?;
    let dates: Vec<String> = history.iter().map(|b| b.trade_date.clone()).collect();
    let gains = bars
        .iter()
        .map(|[_, close, _, high]| BarGains {
            high: gain(*high, base),
            close: gain(*close, base),
        })
        .collect();

    let observed_on = compact_date(observation.date);
    let index = dates.iter().position(|d| *d == observed_on);

    let mut reference_markers = Vec::new();
    let mut projected_threshold = None;
    if let Some(index) = index {
        reference_markers.push(ReferenceMarker {
            kind: ReferenceKind::Low,
            date: observed_on.clone(),
            price: observation.reference_prices.low,
        });
        reference_markers.push(ReferenceMarker {
            kind: ReferenceKind::High,
            date: observed_on.clone(),
            price: base,
        });

        if let (Some(next_date), Some(next_bar)) = (dates.get(index + 1), bars.get(index + 1)) {
            let price = projected_price(base);
            // 与标记上展示的 3 位小数价格比较，而不是未舍入的乘积
            let style = if next_bar[1] >= price {
                ThresholdStyle::Reached
            } else {
                ThresholdStyle::Missed
            };
            projected_threshold = Some(ThresholdMarker {
                date: next_date.clone(),
                price,
                style,
            });
        }
    } else {
        debug!(
            "Observation date {} not in history of {}, markers omitted",
            observed_on, observation.code
        );
    }

    let highlighted_highs = highlights
        .iter()
        .filter_map(|date| {
            let i = dates.iter().position(|d| d == date)?;
            let high = bars[i][3];
            Some(HighlightMarker {
                date: date.clone(),
                high,
                gain: gain(high, base),
            })
        })
        .collect();

    Ok(ChartDataset {
        title: format!("{} ({})", observation.name, observation.code),
        dates,
        bars,
        gains,
        reference_markers,
        projected_threshold,
        highlighted_highs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_projected_price_rounding() {
        assert_eq!(projected_price(100.0), 101.0);
        assert_eq!(projected_price(10.5), 10.605);
        assert_eq!(projected_price(12.345), 12.468);
    }

    #[test]
    fn test_gain_rounding_and_polarity() {
        let g = gain(11.0, 10.0);
        assert_eq!(g.percent, 10.0);
        assert_eq!(g.polarity, Polarity::Up);

        let g = gain(9.87, 10.0);
        assert_eq!(g.percent, -1.3);
        assert_eq!(g.polarity, Polarity::Down);

        let g = gain(10.0, 10.0);
        assert_eq!(g.percent, 0.0);
        assert_eq!(g.polarity, Polarity::Up);

        // 舍入为 0 的微小跌幅也记为上涨
        let g = gain(9.9999, 10.0);
        assert_eq!(g.percent, 0.0);
        assert!(g.percent.is_sign_positive());
        assert_eq!(g.polarity, Polarity::Up);
    }
}
