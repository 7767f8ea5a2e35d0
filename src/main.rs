fn main() {
    oratoria_lib::run()
}
