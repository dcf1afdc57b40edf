use super::*;

#[test]
fn mul_div255_rounds_to_nearest() {
    assert_eq!(mul_div255_u16(255, 255), 255);
    assert_eq!(mul_div255_u16(255, 128), 128);
    assert_eq!(mul_div255_u16(0, 200), 0);
}

#[test]
fn ease_in_out_hits_endpoints_and_midpoint() {
    assert_eq!(ease_in_out(0.0), 0.0);
    assert_eq!(ease_in_out(1.0), 1.0);
    assert_eq!(ease_in_out(0.5), 0.5);
    assert_eq!(ease_in_out(-1.0), 0.0);
    assert_eq!(lerp(2.0, 4.0, 0.5), 3.0);
}
